//! The credit ledger: per-user balances plus the append-only history that
//! explains them.
//!
//! Every balance mutation goes through exactly one method here and writes
//! exactly one [`CreditHistoryEntry`] whose `balance_after` equals the new
//! balance. Each method checks all of its preconditions before touching any
//! state, so a failed call leaves the ledger unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillswap_types::{
    CreditHistoryEntry, Credits, EntryId, EntryKind, ExchangeError, Result, TransactionId, UserId,
};

use crate::conservation::CreditConservation;
use crate::escrow::{EscrowHold, EscrowState};

/// Balances, history, and escrow holds for every account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLedger {
    balances: BTreeMap<UserId, Credits>,
    /// Creation order.
    entries: Vec<CreditHistoryEntry>,
    holds: BTreeMap<TransactionId, EscrowHold>,
    supply: CreditConservation,
}

impl CreditLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------

    /// Open an account with an opening balance.
    ///
    /// A positive opening balance is minted and recorded as an `initial`
    /// entry; a zero balance opens the account without a history row.
    ///
    /// # Errors
    /// - `Validation` if the account exists or `initial` is negative
    /// - `CreditOverflow` if minting `initial` would overflow the supply
    pub fn open_account(
        &mut self,
        user: UserId,
        initial: Credits,
        now: DateTime<Utc>,
    ) -> Result<Option<EntryId>> {
        if self.balances.contains_key(&user) {
            return Err(ExchangeError::validation(format!(
                "ledger account for {user} already exists"
            )));
        }
        if initial < 0 {
            return Err(ExchangeError::validation(
                "opening balance cannot be negative",
            ));
        }
        self.supply.record_mint(initial)?;
        self.balances.insert(user, 0);
        if initial == 0 {
            return Ok(None);
        }
        let id = self.append(user, None, initial, EntryKind::Initial, "Welcome credits", now);
        Ok(Some(id))
    }

    #[must_use]
    pub fn has_account(&self, user: UserId) -> bool {
        self.balances.contains_key(&user)
    }

    /// Current balance; zero for unknown accounts.
    #[must_use]
    pub fn balance(&self, user: UserId) -> Credits {
        self.balances.get(&user).copied().unwrap_or(0)
    }

    /// Admin correction. Positive amounts mint, negative amounts burn.
    ///
    /// # Errors
    /// - `NotFound` for an unknown account
    /// - `Validation` for a zero amount
    /// - `BalanceUnderflow` if the balance would go negative
    /// - `CreditOverflow` if the balance or the minted supply would overflow
    pub fn adjust(
        &mut self,
        user: UserId,
        amount: Credits,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<EntryId> {
        let current = self
            .balances
            .get(&user)
            .copied()
            .ok_or_else(|| ExchangeError::not_found("Account", user))?;
        if amount == 0 {
            return Err(ExchangeError::validation("adjustment amount cannot be zero"));
        }
        let next = current
            .checked_add(amount)
            .ok_or_else(|| ExchangeError::CreditOverflow {
                reason: format!("adjusting {user} by {amount} leaves the credit range"),
            })?;
        if next < 0 {
            return Err(ExchangeError::BalanceUnderflow {
                user: user.to_string(),
            });
        }
        if amount > 0 {
            self.supply.record_mint(amount)?;
        } else {
            self.supply.record_burn(-amount)?;
        }
        Ok(self.append(user, None, amount, EntryKind::Adjustment, reason, now))
    }

    // -----------------------------------------------------------------
    // Escrow
    // -----------------------------------------------------------------

    /// Debit `amount` from `payer` and park it against `transaction`.
    ///
    /// # Errors
    /// - `InvalidTerms` for a non-positive amount
    /// - `LedgerInconsistency` if the transaction already has a hold
    /// - `InsufficientCredits` if the payer cannot cover it
    pub fn reserve(
        &mut self,
        transaction: TransactionId,
        payer: UserId,
        amount: Credits,
        now: DateTime<Utc>,
    ) -> Result<EntryId> {
        if amount <= 0 {
            return Err(ExchangeError::InvalidTerms {
                reason: format!("escrow amount must be positive, got {amount}"),
            });
        }
        if self.holds.contains_key(&transaction) {
            return Err(ExchangeError::LedgerInconsistency {
                reason: format!("escrow for {transaction} already exists"),
            });
        }
        let available = self.balance(payer);
        if available < amount {
            return Err(ExchangeError::InsufficientCredits {
                needed: amount,
                available,
            });
        }

        self.holds
            .insert(transaction, EscrowHold::new(transaction, payer, amount, now));
        let id = self.append(
            payer,
            Some(transaction),
            -amount,
            EntryKind::Reserved,
            "Credits held in escrow",
            now,
        );
        tracing::debug!(tx = %transaction, user = %payer, amount, "escrow reserved");
        Ok(id)
    }

    /// Return a held escrow to its payer.
    ///
    /// # Errors
    /// `EscrowNotFound` / `EscrowNotHeld` if there is nothing to release.
    pub fn release(&mut self, transaction: TransactionId, now: DateTime<Utc>) -> Result<EntryId> {
        let (payer, amount) = self.close_hold(transaction, EscrowState::Released, now)?;
        let id = self.append(
            payer,
            Some(transaction),
            amount,
            EntryKind::Released,
            "Escrow returned",
            now,
        );
        tracing::debug!(tx = %transaction, user = %payer, amount, "escrow released");
        Ok(id)
    }

    /// Pay a held escrow to `payee`.
    ///
    /// # Errors
    /// `EscrowNotFound` / `EscrowNotHeld` if there is nothing to settle.
    pub fn settle(
        &mut self,
        transaction: TransactionId,
        payee: UserId,
        now: DateTime<Utc>,
    ) -> Result<EntryId> {
        let (_, amount) = self.close_hold(transaction, EscrowState::Settled, now)?;
        let id = self.append(
            payee,
            Some(transaction),
            amount,
            EntryKind::Earned,
            "Payment for completed exchange",
            now,
        );
        tracing::debug!(tx = %transaction, user = %payee, amount, "escrow settled");
        Ok(id)
    }

    #[must_use]
    pub fn escrow(&self, transaction: TransactionId) -> Option<&EscrowHold> {
        self.holds.get(&transaction)
    }

    /// True while the transaction has credits parked.
    #[must_use]
    pub fn is_held(&self, transaction: TransactionId) -> bool {
        self.holds.get(&transaction).is_some_and(EscrowHold::is_held)
    }

    /// Credits currently parked across all holds.
    #[must_use]
    pub fn total_held(&self) -> Credits {
        self.holds
            .values()
            .filter(|h| h.is_held())
            .fold(0, |total, h| total.saturating_add(h.amount))
    }

    // -----------------------------------------------------------------
    // History
    // -----------------------------------------------------------------

    /// A user's entries in creation order.
    #[must_use]
    pub fn history(&self, user: UserId) -> Vec<&CreditHistoryEntry> {
        self.entries.iter().filter(|e| e.user_id == user).collect()
    }

    /// Entries tagged with a transaction, in creation order.
    #[must_use]
    pub fn transaction_entries(&self, transaction: TransactionId) -> Vec<&CreditHistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.transaction_id == Some(transaction))
            .collect()
    }

    /// Net of all entries tagged with a transaction. Zero once its escrow
    /// is closed.
    #[must_use]
    pub fn transaction_net(&self, transaction: TransactionId) -> Credits {
        self.entries
            .iter()
            .filter(|e| e.transaction_id == Some(transaction))
            .map(|e| e.amount)
            .sum()
    }

    #[must_use]
    pub fn entries(&self) -> &[CreditHistoryEntry] {
        &self.entries
    }

    // -----------------------------------------------------------------
    // Integrity
    // -----------------------------------------------------------------

    /// Sum of all account balances.
    #[must_use]
    pub fn total_balances(&self) -> Credits {
        self.balances
            .values()
            .fold(0, |total, b| total.saturating_add(*b))
    }

    /// Balances plus held escrow, or `CreditOverflow` if the sum leaves
    /// the `i64` range.
    fn circulating(&self) -> Result<Credits> {
        let held = self.holds.values().filter(|h| h.is_held()).map(|h| h.amount);
        self.balances
            .values()
            .copied()
            .chain(held)
            .try_fold(0, Credits::checked_add)
            .ok_or_else(|| ExchangeError::CreditOverflow {
                reason: "credits in circulation exceed the supply limit".into(),
            })
    }

    /// Check conservation and replay every account's history.
    ///
    /// # Errors
    /// - `ConservationViolation` if balances plus holds differ from supply
    /// - `LedgerInconsistency` if a `balance_after` does not follow from the
    ///   previous row, or the replayed total differs from the cached balance
    pub fn verify(&self) -> Result<()> {
        self.supply.verify(self.circulating()?)?;

        let mut replayed: BTreeMap<UserId, Credits> = BTreeMap::new();
        for entry in &self.entries {
            let running = replayed.entry(entry.user_id).or_insert(0);
            *running = running.checked_add(entry.amount).ok_or_else(|| {
                ExchangeError::LedgerInconsistency {
                    reason: format!("entry {} for {} overflows its replay", entry.id, entry.user_id),
                }
            })?;
            if *running != entry.balance_after {
                return Err(ExchangeError::LedgerInconsistency {
                    reason: format!(
                        "entry {} for {} records balance {} but replay gives {}",
                        entry.id, entry.user_id, entry.balance_after, running
                    ),
                });
            }
            if *running < 0 {
                return Err(ExchangeError::BalanceUnderflow {
                    user: entry.user_id.to_string(),
                });
            }
        }
        for (user, balance) in &self.balances {
            let replay = replayed.get(user).copied().unwrap_or(0);
            if replay != *balance {
                return Err(ExchangeError::LedgerInconsistency {
                    reason: format!("{user} has balance {balance} but history sums to {replay}"),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn supply(&self) -> &CreditConservation {
        &self.supply
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn close_hold(
        &mut self,
        transaction: TransactionId,
        target: EscrowState,
        now: DateTime<Utc>,
    ) -> Result<(UserId, Credits)> {
        let hold = self
            .holds
            .get_mut(&transaction)
            .ok_or_else(|| ExchangeError::EscrowNotFound(transaction.to_string()))?;
        hold.close(target, now)?;
        Ok((hold.payer, hold.amount))
    }

    /// Apply `amount` to `user` and write the matching row. Callers have
    /// already ruled out underflow.
    fn append(
        &mut self,
        user: UserId,
        transaction: Option<TransactionId>,
        amount: Credits,
        kind: EntryKind,
        description: &str,
        now: DateTime<Utc>,
    ) -> EntryId {
        let balance = self.balances.entry(user).or_insert(0);
        *balance += amount;
        let entry = CreditHistoryEntry {
            id: EntryId::new(),
            user_id: user,
            transaction_id: transaction,
            amount,
            kind,
            description: description.to_string(),
            balance_after: *balance,
            created_at: now,
        };
        let id = entry.id;
        self.entries.push(entry);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(amount: Credits) -> (CreditLedger, UserId) {
        let mut ledger = CreditLedger::new();
        let user = UserId::new();
        ledger.open_account(user, amount, Utc::now()).unwrap();
        (ledger, user)
    }

    #[test]
    fn opening_balance_writes_initial_entry() {
        let (ledger, user) = funded(100);
        assert_eq!(ledger.balance(user), 100);
        let history = ledger.history(user);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, EntryKind::Initial);
        assert_eq!(history[0].balance_after, 100);
        ledger.verify().unwrap();
    }

    #[test]
    fn zero_opening_balance_has_no_history() {
        let (ledger, user) = funded(0);
        assert!(ledger.has_account(user));
        assert!(ledger.history(user).is_empty());
    }

    #[test]
    fn duplicate_account_rejected() {
        let (mut ledger, user) = funded(100);
        assert!(ledger.open_account(user, 5, Utc::now()).is_err());
        assert_eq!(ledger.balance(user), 100);
    }

    #[test]
    fn reserve_then_settle_moves_credits() {
        let (mut ledger, requester) = funded(100);
        let provider = UserId::new();
        ledger.open_account(provider, 100, Utc::now()).unwrap();
        let tx = TransactionId::new();

        ledger.reserve(tx, requester, 30, Utc::now()).unwrap();
        assert_eq!(ledger.balance(requester), 70);
        assert!(ledger.is_held(tx));
        assert_eq!(ledger.total_held(), 30);
        ledger.verify().unwrap();

        ledger.settle(tx, provider, Utc::now()).unwrap();
        assert_eq!(ledger.balance(requester), 70);
        assert_eq!(ledger.balance(provider), 130);
        assert!(!ledger.is_held(tx));
        assert_eq!(ledger.transaction_net(tx), 0);
        ledger.verify().unwrap();

        let earned = ledger.history(provider);
        assert_eq!(earned.last().unwrap().kind, EntryKind::Earned);
        assert_eq!(earned.last().unwrap().amount, 30);
    }

    #[test]
    fn release_returns_credits() {
        let (mut ledger, requester) = funded(100);
        let tx = TransactionId::new();
        ledger.reserve(tx, requester, 30, Utc::now()).unwrap();
        ledger.release(tx, Utc::now()).unwrap();
        assert_eq!(ledger.balance(requester), 100);
        assert_eq!(ledger.transaction_net(tx), 0);
        let kinds: Vec<EntryKind> = ledger.history(requester).iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EntryKind::Initial, EntryKind::Reserved, EntryKind::Released]
        );
    }

    #[test]
    fn insufficient_credits_leaves_ledger_untouched() {
        let (mut ledger, requester) = funded(20);
        let tx = TransactionId::new();
        let err = ledger.reserve(tx, requester, 30, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            ExchangeError::InsufficientCredits {
                needed: 30,
                available: 20
            }
        );
        assert_eq!(ledger.balance(requester), 20);
        assert!(ledger.escrow(tx).is_none());
        assert_eq!(ledger.history(requester).len(), 1);
    }

    #[test]
    fn escrow_closes_once() {
        let (mut ledger, requester) = funded(100);
        let provider = UserId::new();
        let tx = TransactionId::new();
        ledger.reserve(tx, requester, 30, Utc::now()).unwrap();
        ledger.settle(tx, provider, Utc::now()).unwrap();

        assert!(matches!(
            ledger.settle(tx, provider, Utc::now()),
            Err(ExchangeError::EscrowNotHeld { .. })
        ));
        assert!(ledger.release(tx, Utc::now()).is_err());
        assert_eq!(ledger.balance(provider), 30);
        assert_eq!(ledger.balance(requester), 70);
    }

    #[test]
    fn double_reserve_rejected() {
        let (mut ledger, requester) = funded(100);
        let tx = TransactionId::new();
        ledger.reserve(tx, requester, 10, Utc::now()).unwrap();
        assert!(matches!(
            ledger.reserve(tx, requester, 10, Utc::now()),
            Err(ExchangeError::LedgerInconsistency { .. })
        ));
        assert_eq!(ledger.balance(requester), 90);
    }

    #[test]
    fn release_unknown_escrow() {
        let mut ledger = CreditLedger::new();
        assert!(matches!(
            ledger.release(TransactionId::new(), Utc::now()),
            Err(ExchangeError::EscrowNotFound(_))
        ));
    }

    #[test]
    fn adjustments_mint_and_burn() {
        let (mut ledger, user) = funded(100);
        ledger.adjust(user, 25, "bonus", Utc::now()).unwrap();
        ledger.adjust(user, -50, "clawback", Utc::now()).unwrap();
        assert_eq!(ledger.balance(user), 75);
        assert_eq!(ledger.supply().expected_supply(), 75);
        ledger.verify().unwrap();

        assert!(matches!(
            ledger.adjust(user, -76, "too much", Utc::now()),
            Err(ExchangeError::BalanceUnderflow { .. })
        ));
        assert!(ledger.adjust(user, 0, "noop", Utc::now()).is_err());
        assert!(ledger.adjust(UserId::new(), 5, "ghost", Utc::now()).is_err());
        assert_eq!(ledger.balance(user), 75);
    }

    #[test]
    fn balance_after_chains() {
        let (mut ledger, user) = funded(100);
        for _ in 0..3 {
            let tx = TransactionId::new();
            ledger.reserve(tx, user, 10, Utc::now()).unwrap();
            ledger.release(tx, Utc::now()).unwrap();
        }
        let history = ledger.history(user);
        let mut running = 0;
        for entry in history {
            running += entry.amount;
            assert_eq!(entry.balance_after, running);
        }
        assert_eq!(running, ledger.balance(user));
    }

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let (mut ledger, user) = funded(100);
        ledger.reserve(TransactionId::new(), user, 40, Utc::now()).unwrap();
        let json = serde_json::to_string(&ledger).unwrap();
        let back: CreditLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
        back.verify().unwrap();
    }

    #[test]
    fn oversized_adjustment_is_refused_without_trace() {
        let (mut ledger, user) = funded(100);
        let entries = ledger.entries().len();

        let err = ledger.adjust(user, Credits::MAX, "bonus", Utc::now()).unwrap_err();
        assert!(matches!(err, ExchangeError::CreditOverflow { .. }));
        assert_eq!(ledger.balance(user), 100);
        assert_eq!(ledger.entries().len(), entries);
        assert_eq!(ledger.supply().total_minted(), 100);

        let err = ledger.adjust(user, Credits::MIN, "clawback", Utc::now()).unwrap_err();
        assert!(matches!(err, ExchangeError::BalanceUnderflow { .. }));
        ledger.verify().unwrap();
    }

    #[test]
    fn supply_limit_applies_across_accounts() {
        let (mut ledger, _) = funded(Credits::MAX - 10);
        let other = UserId::new();
        let err = ledger.open_account(other, 11, Utc::now()).unwrap_err();
        assert!(matches!(err, ExchangeError::CreditOverflow { .. }));
        assert!(!ledger.has_account(other));
        ledger.open_account(other, 10, Utc::now()).unwrap();
        ledger.verify().unwrap();
    }
}
