//! The transaction state machine and its escrow side effects.
//!
//! ## Transitions
//!
//! | From        | Call                    | Who       | To          | Escrow   |
//! |-------------|-------------------------|-----------|-------------|----------|
//! | (accept)    | match / offer accepted  | requester | pending     | reserve  |
//! | pending     | start                   | provider  | in_progress |          |
//! | in_progress | both confirm            | either    | completed   | settle   |
//! | pending     | cancel                  | requester | cancelled   | release  |
//! | pending     | reject                  | provider  | cancelled   | release  |
//! | pending     | counter-offer           | provider  | cancelled   | release  |
//! | pending     | report request          | provider  | disputed    | (kept)   |
//! | in_progress | open dispute            | either    | disputed    | (kept)   |
//!
//! Every credit movement happens inside the same atomic call as the status
//! change it belongs to.

use skillswap_types::{
    BlobRef, Credits, ExchangeError, MatchId, MatchStatus, Negotiation, NegotiationId,
    NegotiationStatus, NotificationKind, PartyRole, Report, ReportId, ReportStatus, ReportTarget,
    RequestId, RequestStatus, Result, Terms, Transaction, TransactionId, TransactionStatus, User,
    UserId,
};

use crate::engine::{Ctx, Exchange};

/// Terms both sides agreed to, ready to become a transaction.
pub(crate) struct Agreement {
    pub request_id: RequestId,
    pub match_id: MatchId,
    pub negotiation_id: Option<NegotiationId>,
    pub requester_id: UserId,
    pub provider_id: UserId,
    pub terms: Terms,
}

impl Exchange {
    pub fn transaction(&self, token: &str, tx_id: TransactionId) -> Result<Transaction> {
        self.query(|r| {
            let user = r.authenticate(token)?;
            let tx = r.db.transaction(tx_id)?;
            if tx.party_of(user.id).is_none() && !user.is_admin() {
                return Err(ExchangeError::not_found("Transaction", tx_id));
            }
            Ok(tx.clone())
        })
    }

    /// Provider begins work.
    ///
    /// # Errors
    /// `WrongParty` unless the caller is the provider, `InvalidState` unless
    /// the transaction is pending.
    pub fn start_transaction(&self, token: &str, tx_id: TransactionId) -> Result<()> {
        self.run(|cx| {
            let (_, tx) = party_transaction(
                cx,
                token,
                tx_id,
                Some((PartyRole::Provider, "start this transaction")),
            )?;
            expect_status(&tx, TransactionStatus::Pending)?;

            let now = cx.now;
            let t = cx.db.transaction_mut(tx_id)?;
            t.status = TransactionStatus::InProgress;
            t.started_at = Some(now);
            cx.db
                .request_mut(tx.request_id)?
                .set_status(RequestStatus::InProgress, now);
            cx.notify(
                tx.requester_id,
                NotificationKind::TransactionStarted,
                "Your provider has started work",
                tx_id,
            );
            tracing::info!(tx = %tx_id, "transaction started");
            Ok(())
        })
    }

    /// Record one party's confirmation. The second confirmation completes
    /// the transaction and pays the provider.
    ///
    /// # Errors
    /// - `InvalidState` unless the transaction is in progress
    /// - `AlreadyConfirmed` if this party already confirmed
    pub fn confirm_completion(
        &self,
        token: &str,
        tx_id: TransactionId,
    ) -> Result<TransactionStatus> {
        self.run(|cx| {
            let (role, tx) = party_transaction(cx, token, tx_id, None)?;
            expect_status(&tx, TransactionStatus::InProgress)?;
            if tx.is_confirmed_by(role) {
                return Err(ExchangeError::AlreadyConfirmed {
                    party: role.as_str(),
                });
            }

            let t = cx.db.transaction_mut(tx_id)?;
            t.confirm(role);
            if t.fully_confirmed() {
                complete_transaction(cx, tx_id)?;
                return Ok(TransactionStatus::Completed);
            }
            cx.notify(
                tx.counterparty(role),
                NotificationKind::CompletionConfirmed,
                format!("The {role} confirmed completion; your confirmation is needed"),
                tx_id,
            );
            tracing::info!(tx = %tx_id, %role, "completion confirmed");
            Ok(TransactionStatus::InProgress)
        })
    }

    /// Requester withdraws before work starts; the request is closed.
    ///
    /// # Errors
    /// `WrongParty` unless the caller is the requester, `InvalidState`
    /// unless the transaction is pending.
    pub fn cancel_transaction(&self, token: &str, tx_id: TransactionId) -> Result<()> {
        self.run(|cx| {
            let (_, tx) = party_transaction(
                cx,
                token,
                tx_id,
                Some((PartyRole::Requester, "cancel this transaction")),
            )?;
            expect_status(&tx, TransactionStatus::Pending)?;

            end_transaction(cx, &tx, TransactionStatus::Cancelled)?;
            cx.db
                .request_mut(tx.request_id)?
                .set_status(RequestStatus::Cancelled, cx.now);
            cx.notify(
                tx.provider_id,
                NotificationKind::TransactionCancelled,
                "The requester cancelled the transaction",
                tx_id,
            );
            tracing::info!(tx = %tx_id, "transaction cancelled");
            Ok(())
        })
    }

    /// Provider declines before work starts; the request goes back to the
    /// matching pool.
    ///
    /// # Errors
    /// `WrongParty` unless the caller is the provider, `InvalidState`
    /// unless the transaction is pending.
    pub fn reject_transaction(&self, token: &str, tx_id: TransactionId) -> Result<()> {
        self.run(|cx| {
            let (_, tx) = party_transaction(
                cx,
                token,
                tx_id,
                Some((PartyRole::Provider, "reject this transaction")),
            )?;
            expect_status(&tx, TransactionStatus::Pending)?;

            end_transaction(cx, &tx, TransactionStatus::Cancelled)?;
            cx.db.request_mut(tx.request_id)?.reopen(cx.now);
            cx.db.suggested_match_mut(tx.match_id)?.status = MatchStatus::Rejected;
            cx.notify(
                tx.requester_id,
                NotificationKind::TransactionRejected,
                "The provider declined; your request is open again",
                tx_id,
            );
            tracing::info!(tx = %tx_id, "transaction rejected");
            Ok(())
        })
    }

    /// Provider proposes different terms from inside a pending transaction.
    /// The transaction is unwound and negotiation resumes on the same match.
    ///
    /// # Errors
    /// - `WrongParty` unless the caller is the provider
    /// - `InvalidState` unless the transaction is pending
    /// - `InvalidTerms` for incomplete terms
    pub fn provider_counter_offer(
        &self,
        token: &str,
        tx_id: TransactionId,
        terms: Terms,
        message: Option<String>,
    ) -> Result<NegotiationId> {
        self.run(|cx| {
            let (_, tx) = party_transaction(
                cx,
                token,
                tx_id,
                Some((PartyRole::Provider, "counter-offer on this transaction")),
            )?;
            cx.db.user(tx.provider_id)?.ensure_can_trade(cx.now, "negotiate")?;
            expect_status(&tx, TransactionStatus::Pending)?;
            terms.validate()?;

            end_transaction(cx, &tx, TransactionStatus::Cancelled)?;
            cx.db.request_mut(tx.request_id)?.reopen(cx.now);
            cx.db.suggested_match_mut(tx.match_id)?.status = MatchStatus::Pending;

            let negotiation = Negotiation {
                id: NegotiationId::new(),
                request_id: tx.request_id,
                match_id: tx.match_id,
                initiator_role: PartyRole::Provider,
                proposed_by: tx.provider_id,
                terms,
                message,
                status: NegotiationStatus::Pending,
                created_at: cx.now,
                responded_at: None,
            };
            let id = negotiation.id;
            cx.db.negotiations.insert(id, negotiation);
            cx.notify(
                tx.requester_id,
                NotificationKind::NegotiationReceived,
                "The provider proposed new terms",
                id,
            );
            tracing::info!(tx = %tx_id, neg = %id, "transaction unwound into counter-offer");
            Ok(id)
        })
    }

    /// Provider reports the request behind a pending transaction. The
    /// transaction pauses in `disputed` with its escrow intact until an
    /// admin rules on the report.
    ///
    /// # Errors
    /// `WrongParty` unless the caller is the provider, `InvalidState`
    /// unless the transaction is pending, `Validation` for a blank reason.
    pub fn report_request_from_transaction(
        &self,
        token: &str,
        tx_id: TransactionId,
        reason: &str,
        description: &str,
    ) -> Result<ReportId> {
        self.run(|cx| {
            let (_, tx) = party_transaction(
                cx,
                token,
                tx_id,
                Some((PartyRole::Provider, "report this request")),
            )?;
            expect_status(&tx, TransactionStatus::Pending)?;
            if reason.trim().is_empty() {
                return Err(ExchangeError::validation("report reason is required"));
            }

            let report = Report {
                id: ReportId::new(),
                reporter_id: tx.provider_id,
                target: ReportTarget::Request(tx.request_id),
                reason: reason.trim().to_string(),
                description: description.trim().to_string(),
                status: ReportStatus::Pending,
                paused_transaction_id: Some(tx_id),
                admin_note: None,
                resolved_by: None,
                resolved_at: None,
                created_at: cx.now,
            };
            let id = report.id;
            cx.db.reports.insert(id, report);
            cx.db.request_mut(tx.request_id)?.is_reported = true;
            cx.db.transaction_mut(tx_id)?.status = TransactionStatus::Disputed;
            cx.notify(
                tx.requester_id,
                NotificationKind::TransactionReported,
                "Your request was reported; the transaction is paused pending review",
                tx_id,
            );
            tracing::info!(tx = %tx_id, report = %id, "request reported from transaction");
            Ok(id)
        })
    }
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

/// Turn an agreement into a pending transaction.
///
/// Reserves escrow first, so an underfunded requester fails the whole call.
/// Then the winning match is accepted, every other live match and offer on
/// the request is rejected, and the request moves to `matched`.
pub(crate) fn create_transaction(cx: &mut Ctx<'_>, deal: Agreement) -> Result<TransactionId> {
    let tx_id = TransactionId::new();
    let now = cx.now;
    if let Some(amount) = deal.terms.credit_amount() {
        cx.db.ledger.reserve(tx_id, deal.requester_id, amount, now)?;
    }

    for m in cx.db.matches.values_mut() {
        if m.request_id != deal.request_id {
            continue;
        }
        if m.id == deal.match_id {
            m.status = MatchStatus::Accepted;
        } else if m.status == MatchStatus::Pending {
            m.status = MatchStatus::Rejected;
        }
    }
    for n in cx.db.negotiations.values_mut() {
        if n.request_id == deal.request_id && n.is_pending() && Some(n.id) != deal.negotiation_id {
            n.close(NegotiationStatus::Rejected, now);
        }
    }
    let request = cx.db.request_mut(deal.request_id)?;
    request.status = RequestStatus::Matched;
    request.matched_provider_id = Some(deal.provider_id);
    request.updated_at = now;

    let tx = Transaction {
        id: tx_id,
        request_id: deal.request_id,
        match_id: deal.match_id,
        negotiation_id: deal.negotiation_id,
        requester_id: deal.requester_id,
        provider_id: deal.provider_id,
        terms: deal.terms,
        status: TransactionStatus::Pending,
        requester_confirmed: false,
        provider_confirmed: false,
        created_at: now,
        started_at: None,
        completed_at: None,
    };
    cx.db.transactions.insert(tx_id, tx);
    cx.notify(
        deal.provider_id,
        NotificationKind::MatchAccepted,
        "You were selected for a request",
        tx_id,
    );
    tracing::info!(
        tx = %tx_id,
        req = %deal.request_id,
        provider = %deal.provider_id,
        "transaction created"
    );
    Ok(tx_id)
}

/// Mark a transaction and its request completed and pay the provider if the
/// escrow is still held. Safe to call on a transaction whose escrow was
/// already settled.
pub(crate) fn complete_transaction(cx: &mut Ctx<'_>, tx_id: TransactionId) -> Result<Option<Credits>> {
    let now = cx.now;
    let tx = cx.db.transaction_mut(tx_id)?;
    tx.status = TransactionStatus::Completed;
    tx.completed_at = Some(now);
    let tx = tx.clone();
    cx.db
        .request_mut(tx.request_id)?
        .set_status(RequestStatus::Completed, now);

    let paid = match tx.terms.credit_amount() {
        Some(amount) if cx.db.ledger.is_held(tx_id) => {
            cx.db.ledger.settle(tx_id, tx.provider_id, now)?;
            Some(amount)
        }
        _ => None,
    };
    for user in [tx.requester_id, tx.provider_id] {
        cx.notify(
            user,
            NotificationKind::TransactionCompleted,
            "Transaction completed",
            tx_id,
        );
    }
    tracing::info!(tx = %tx_id, paid = paid.unwrap_or(0), "transaction completed");
    Ok(paid)
}

/// Close a transaction without completing it, returning any held escrow.
pub(crate) fn end_transaction(
    cx: &mut Ctx<'_>,
    tx: &Transaction,
    status: TransactionStatus,
) -> Result<()> {
    if cx.db.ledger.is_held(tx.id) {
        cx.db.ledger.release(tx.id, cx.now)?;
    }
    cx.db.transaction_mut(tx.id)?.status = status;
    Ok(())
}

/// Authenticate, load the transaction, and resolve the caller's side of it.
/// With `required`, the caller must be on that side.
pub(crate) fn party_transaction(
    cx: &Ctx<'_>,
    token: &str,
    tx_id: TransactionId,
    required: Option<(PartyRole, &'static str)>,
) -> Result<(PartyRole, Transaction)> {
    let user: User = cx.authenticate(token)?;
    let tx = cx.db.transaction(tx_id)?;
    let Some(role) = tx.party_of(user.id) else {
        return Err(ExchangeError::Forbidden {
            reason: "not a party to this transaction".into(),
        });
    };
    if let Some((expected, action)) = required {
        if role != expected {
            return Err(ExchangeError::WrongParty {
                expected: expected.as_str(),
                action,
            });
        }
    }
    Ok((role, tx.clone()))
}

pub(crate) fn expect_status(tx: &Transaction, expected: TransactionStatus) -> Result<()> {
    if tx.status != expected {
        return Err(ExchangeError::invalid_state(
            "Transaction",
            expected.to_string(),
            tx.status,
        ));
    }
    Ok(())
}

/// Evidence references must be non-blank when supplied.
pub(crate) fn check_evidence(evidence: Option<&BlobRef>) -> Result<()> {
    if evidence.is_some_and(BlobRef::is_empty) {
        return Err(ExchangeError::validation("evidence reference is blank"));
    }
    Ok(())
}
