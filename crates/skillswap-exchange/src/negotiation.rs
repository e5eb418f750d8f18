//! Counter-offers on a suggested match.
//!
//! ## Chain
//!
//! ```text
//!   offer(requester) ──counter──▶ offer(provider) ──counter──▶ offer(requester) ...
//!         │                             │
//!         ├─ accept ─▶ transaction      ├─ accept ─▶ transaction
//!         └─ reject                     └─ reject
//! ```
//!
//! A match carries at most one pending offer. Only the side that did not
//! make the live offer may answer it; which side the caller is on comes
//! from the request and match, never from the offer's author field.

use serde::Serialize;
use skillswap_types::{
    ExchangeError, MatchId, Negotiation, NegotiationId, NegotiationResponse, NegotiationStatus,
    NotificationKind, PartyRole, Result, Terms, TransactionId, User,
};

use crate::engine::{Ctx, Exchange};
use crate::transactions::{Agreement, create_transaction};

/// What answering an offer led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NegotiationOutcome {
    Accepted { transaction_id: TransactionId },
    Rejected,
    Countered { negotiation_id: NegotiationId },
}

/// How a new offer relates to one already live on the match.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Supersede {
    /// Any live offer blocks the new one.
    Never,
    /// A live offer addressed to the sender is replaced.
    Incoming,
}

impl Exchange {
    /// The requester's opening offer on a pending match.
    ///
    /// # Errors
    /// - `WrongParty` unless the caller owns the request
    /// - `AlreadyProcessed` if the match is no longer pending
    /// - `NegotiationPending` if any offer is live on the match
    /// - `InvalidTerms` for incomplete terms
    pub fn send_negotiation(
        &self,
        token: &str,
        match_id: MatchId,
        terms: Terms,
        message: Option<String>,
    ) -> Result<NegotiationId> {
        self.run(|cx| {
            propose(
                cx,
                token,
                match_id,
                PartyRole::Requester,
                terms,
                message,
                Supersede::Never,
            )
        })
    }

    /// Requester counters on a match; a live provider offer is superseded.
    ///
    /// # Errors
    /// As [`Self::send_negotiation`], except that only the requester's own
    /// live offer blocks.
    pub fn send_requester_counter_offer(
        &self,
        token: &str,
        match_id: MatchId,
        terms: Terms,
        message: Option<String>,
    ) -> Result<NegotiationId> {
        self.run(|cx| {
            propose(
                cx,
                token,
                match_id,
                PartyRole::Requester,
                terms,
                message,
                Supersede::Incoming,
            )
        })
    }

    /// Provider offers or counters on a match; a live requester offer is
    /// superseded.
    ///
    /// # Errors
    /// - `WrongParty` unless the caller is the match's provider
    /// - `NegotiationPending` if the provider's own offer is still live
    pub fn send_provider_counter_offer(
        &self,
        token: &str,
        match_id: MatchId,
        terms: Terms,
        message: Option<String>,
    ) -> Result<NegotiationId> {
        self.run(|cx| {
            propose(
                cx,
                token,
                match_id,
                PartyRole::Provider,
                terms,
                message,
                Supersede::Incoming,
            )
        })
    }

    /// Answer the live offer addressed to the caller.
    ///
    /// # Errors
    /// - `Forbidden` for callers outside the match
    /// - `WrongParty` for the offer's own sender
    /// - `AlreadyProcessed` if the offer was already answered
    /// - `InsufficientCredits` when accepting credit terms the requester
    ///   cannot fund
    pub fn respond_to_negotiation(
        &self,
        token: &str,
        negotiation_id: NegotiationId,
        response: NegotiationResponse,
    ) -> Result<NegotiationOutcome> {
        self.run(|cx| {
            let user = cx.authenticate(token)?;
            let neg = cx.db.negotiation(negotiation_id)?.clone();
            let m = cx.db.suggested_match(neg.match_id)?;
            let request = cx.db.request(neg.request_id)?;
            let role = if request.requester_id == user.id {
                PartyRole::Requester
            } else if m.provider_id == user.id {
                PartyRole::Provider
            } else {
                return Err(ExchangeError::Forbidden {
                    reason: "not a party to this negotiation".into(),
                });
            };
            if !neg.is_pending() {
                return Err(ExchangeError::AlreadyProcessed {
                    entity: "Negotiation",
                });
            }
            if role != neg.recipient_role() {
                return Err(ExchangeError::WrongParty {
                    expected: neg.recipient_role().as_str(),
                    action: "respond to this offer",
                });
            }

            match response {
                NegotiationResponse::Accept => {
                    user.ensure_can_trade(cx.now, "accept offers")?;
                    if !m.is_pending() {
                        return Err(ExchangeError::AlreadyProcessed { entity: "Match" });
                    }
                    if !request.is_open() {
                        return Err(ExchangeError::invalid_state(
                            "Request",
                            "open",
                            request.status,
                        ));
                    }
                    let agreement = Agreement {
                        request_id: request.id,
                        match_id: m.id,
                        negotiation_id: Some(neg.id),
                        requester_id: request.requester_id,
                        provider_id: m.provider_id,
                        terms: neg.terms.clone(),
                    };
                    let transaction_id = create_transaction(cx, agreement)?;
                    cx.db
                        .negotiation_mut(negotiation_id)?
                        .close(NegotiationStatus::Accepted, cx.now);
                    cx.notify(
                        neg.proposed_by,
                        NotificationKind::NegotiationAccepted,
                        "Your offer was accepted",
                        transaction_id,
                    );
                    tracing::info!(neg = %negotiation_id, tx = %transaction_id, "offer accepted");
                    Ok(NegotiationOutcome::Accepted { transaction_id })
                }
                NegotiationResponse::Reject => {
                    cx.db
                        .negotiation_mut(negotiation_id)?
                        .close(NegotiationStatus::Rejected, cx.now);
                    cx.notify(
                        neg.proposed_by,
                        NotificationKind::NegotiationRejected,
                        "Your offer was declined",
                        negotiation_id,
                    );
                    tracing::info!(neg = %negotiation_id, "offer declined");
                    Ok(NegotiationOutcome::Rejected)
                }
                NegotiationResponse::Counter { terms, message } => {
                    let negotiation_id = propose(
                        cx,
                        token,
                        neg.match_id,
                        role,
                        terms,
                        message,
                        Supersede::Incoming,
                    )?;
                    Ok(NegotiationOutcome::Countered { negotiation_id })
                }
            }
        })
    }

    /// Offers on a match, oldest first. Visible to both sides of the match.
    pub fn negotiations_for_match(
        &self,
        token: &str,
        match_id: MatchId,
    ) -> Result<Vec<Negotiation>> {
        self.query(|r| {
            let user = r.authenticate(token)?;
            let m = r.db.suggested_match(match_id)?;
            let requester = r.db.request(m.request_id)?.requester_id;
            if user.id != requester && user.id != m.provider_id {
                return Err(ExchangeError::Forbidden {
                    reason: "not a party to this match".into(),
                });
            }
            Ok(r.db
                .negotiations
                .values()
                .filter(|n| n.match_id == match_id)
                .cloned()
                .collect())
        })
    }
}

/// Place a new offer from `role` on a pending match.
fn propose(
    cx: &mut Ctx<'_>,
    token: &str,
    match_id: MatchId,
    role: PartyRole,
    terms: Terms,
    message: Option<String>,
    supersede: Supersede,
) -> Result<NegotiationId> {
    let user: User = cx.authenticate(token)?;
    let m = cx.db.suggested_match(match_id)?;
    let request = cx.db.request(m.request_id)?;
    let party = match role {
        PartyRole::Requester => request.requester_id,
        PartyRole::Provider => m.provider_id,
    };
    if party != user.id {
        return Err(ExchangeError::WrongParty {
            expected: role.as_str(),
            action: "make an offer on this match",
        });
    }
    user.ensure_can_trade(cx.now, "negotiate")?;
    if !m.is_pending() {
        return Err(ExchangeError::AlreadyProcessed { entity: "Match" });
    }
    if !request.is_open() {
        return Err(ExchangeError::invalid_state("Request", "open", request.status));
    }
    let live = cx.db.pending_negotiation_for_match(match_id).map(|n| (n.id, n.initiator_role));
    let superseded = match (live, supersede) {
        (None, _) => None,
        (Some((id, initiator)), Supersede::Incoming) if initiator != role => Some(id),
        (Some(_), _) => return Err(ExchangeError::NegotiationPending),
    };
    terms.validate()?;

    let request_id = request.id;
    let recipient = match role {
        PartyRole::Requester => m.provider_id,
        PartyRole::Provider => request.requester_id,
    };
    let now = cx.now;
    if let Some(id) = superseded {
        cx.db.negotiation_mut(id)?.close(NegotiationStatus::Rejected, now);
    }
    let negotiation = Negotiation {
        id: NegotiationId::new(),
        request_id,
        match_id,
        initiator_role: role,
        proposed_by: user.id,
        terms,
        message,
        status: NegotiationStatus::Pending,
        created_at: now,
        responded_at: None,
    };
    let id = negotiation.id;
    cx.db.negotiations.insert(id, negotiation);
    cx.notify(
        recipient,
        NotificationKind::NegotiationReceived,
        format!("New offer from the {role}"),
        id,
    );
    tracing::info!(neg = %id, %match_id, %role, superseded = superseded.is_some(), "offer sent");
    Ok(id)
}
