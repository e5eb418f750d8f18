//! Persisted state: flat entity collections keyed by id.
//!
//! Ids are UUIDv7, so iterating a `BTreeMap` is iterating in creation
//! order. Index-style lookups (by status, by owner, by `(request, status)`)
//! are scans over these maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skillswap_ledger::CreditLedger;
use skillswap_types::{
    Dispute, DisputeId, ExchangeError, FraudAlert, FraudAlertId, MatchId, MatchStatus, Negotiation,
    NegotiationId, Rating, RatingId, Report, ReportId, RequestId, Result, ServiceRequest, SkillId,
    SkillRecord, SuggestedMatch, Transaction, TransactionId, TransactionStatus, User, UserId,
    constants::UNKNOWN_DISPLAY_NAME,
};

use crate::journal::AdminJournal;

/// Everything a handler may read or write, apart from the journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Records {
    pub users: BTreeMap<UserId, User>,
    pub skills: BTreeMap<SkillId, SkillRecord>,
    pub requests: BTreeMap<RequestId, ServiceRequest>,
    pub matches: BTreeMap<MatchId, SuggestedMatch>,
    pub negotiations: BTreeMap<NegotiationId, Negotiation>,
    pub transactions: BTreeMap<TransactionId, Transaction>,
    pub ratings: BTreeMap<RatingId, Rating>,
    pub reports: BTreeMap<ReportId, Report>,
    pub disputes: BTreeMap<DisputeId, Dispute>,
    pub fraud_alerts: BTreeMap<FraudAlertId, FraudAlert>,
    pub ledger: CreditLedger,
}

/// The full snapshot guarded by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub records: Records,
    pub journal: AdminJournal,
}

/// Generates a `get` / `get_mut` pair that turns a missing id into
/// `NotFound`.
macro_rules! lookup {
    ($get:ident, $get_mut:ident, $field:ident, $id:ty, $ty:ty, $entity:literal) => {
        pub fn $get(&self, id: $id) -> Result<&$ty> {
            self.$field
                .get(&id)
                .ok_or_else(|| ExchangeError::not_found($entity, id))
        }

        pub fn $get_mut(&mut self, id: $id) -> Result<&mut $ty> {
            self.$field
                .get_mut(&id)
                .ok_or_else(|| ExchangeError::not_found($entity, id))
        }
    };
}

impl Records {
    lookup!(user, user_mut, users, UserId, User, "User");
    lookup!(request, request_mut, requests, RequestId, ServiceRequest, "Request");
    lookup!(suggested_match, suggested_match_mut, matches, MatchId, SuggestedMatch, "Match");
    lookup!(negotiation, negotiation_mut, negotiations, NegotiationId, Negotiation, "Negotiation");
    lookup!(transaction, transaction_mut, transactions, TransactionId, Transaction, "Transaction");
    lookup!(rating, rating_mut, ratings, RatingId, Rating, "Rating");
    lookup!(report, report_mut, reports, ReportId, Report, "Report");
    lookup!(dispute, dispute_mut, disputes, DisputeId, Dispute, "Dispute");
    lookup!(fraud_alert, fraud_alert_mut, fraud_alerts, FraudAlertId, FraudAlert, "FraudAlert");

    /// Display name for read paths; dangling references resolve to the
    /// `"Unknown"` sentinel.
    #[must_use]
    pub fn display_name(&self, id: UserId) -> String {
        self.users
            .get(&id)
            .map_or_else(|| UNKNOWN_DISPLAY_NAME.to_string(), |u| u.display_name.clone())
    }

    /// Matches for a request, optionally filtered by status.
    pub fn matches_for_request(
        &self,
        request: RequestId,
        status: Option<MatchStatus>,
    ) -> impl Iterator<Item = &SuggestedMatch> {
        self.matches
            .values()
            .filter(move |m| m.request_id == request && status.is_none_or(|s| m.status == s))
    }

    /// The live offer on a match, if any.
    #[must_use]
    pub fn pending_negotiation_for_match(&self, match_id: MatchId) -> Option<&Negotiation> {
        self.negotiations
            .values()
            .find(|n| n.match_id == match_id && n.is_pending())
    }

    /// Every negotiation ever made on a request, in creation order.
    pub fn negotiations_for_request(
        &self,
        request: RequestId,
    ) -> impl Iterator<Item = &Negotiation> {
        self.negotiations
            .values()
            .filter(move |n| n.request_id == request)
    }

    pub fn transactions_for_request(
        &self,
        request: RequestId,
    ) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .values()
            .filter(move |t| t.request_id == request)
    }

    /// The open dispute on a transaction, if any.
    #[must_use]
    pub fn open_dispute_for(&self, transaction: TransactionId) -> Option<&Dispute> {
        self.disputes
            .values()
            .find(|d| d.transaction_id == transaction && d.status.is_open())
    }

    /// Active admin accounts.
    pub fn admins(&self) -> impl Iterator<Item = &User> {
        self.users.values().filter(|u| u.is_admin() && u.is_active)
    }

    /// Cross-check escrow against transaction status and replay the
    /// ledger.
    ///
    /// # Errors
    /// - `LedgerInconsistency` if a terminal credit transaction still has
    ///   credits tagged to it, or a live one has no held escrow
    /// - any error from [`CreditLedger::verify`]
    pub fn verify_integrity(&self) -> Result<()> {
        self.ledger.verify()?;
        for tx in self.transactions.values() {
            if tx.terms.credit_amount().is_none() {
                continue;
            }
            let net = self.ledger.transaction_net(tx.id);
            if tx.status.is_terminal() && net != 0 {
                return Err(ExchangeError::LedgerInconsistency {
                    reason: format!("{} is {} but {net} credits remain tagged", tx.id, tx.status),
                });
            }
            let live = matches!(
                tx.status,
                TransactionStatus::Pending
                    | TransactionStatus::InProgress
                    | TransactionStatus::Disputed
            );
            if live && !self.ledger.is_held(tx.id) {
                return Err(ExchangeError::LedgerInconsistency {
                    reason: format!("{} is {} without held escrow", tx.id, tx.status),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use skillswap_types::Role;

    use super::*;

    #[test]
    fn missing_ids_are_not_found() {
        let records = Records::default();
        let err = records.request(RequestId::new()).unwrap_err();
        assert!(matches!(err, ExchangeError::NotFound { entity: "Request", .. }));
    }

    #[test]
    fn dangling_user_resolves_to_unknown() {
        let mut records = Records::default();
        let user = User::new("ana", Role::User, Utc::now());
        let id = user.id;
        records.users.insert(id, user);
        assert_eq!(records.display_name(id), "ana");
        assert_eq!(records.display_name(UserId::new()), "Unknown");
    }

    #[test]
    fn integrity_flags_live_transaction_without_escrow() {
        let mut records = Records::default();
        let tx = Transaction::dummy_credit(
            UserId::new(),
            UserId::new(),
            30,
            TransactionStatus::Pending,
            Utc::now(),
        );
        records.transactions.insert(tx.id, tx);
        assert!(matches!(
            records.verify_integrity(),
            Err(ExchangeError::LedgerInconsistency { .. })
        ));
    }

    #[test]
    fn state_snapshot_roundtrip() {
        let mut state = State::default();
        let user = User::new("ana", Role::User, Utc::now());
        state
            .records
            .ledger
            .open_account(user.id, 100, Utc::now())
            .unwrap();
        state.records.users.insert(user.id, user);
        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
