//! Service request lifecycle: posting, viewing, and cancelling.

use serde::Serialize;
use skillswap_types::{
    ExchangeError, MatchStatus, Negotiation, NegotiationStatus, NewRequest, RequestId,
    RequestStatus, Result, ServiceRequest, SuggestedMatch, Terms, normalize_skill,
};

use crate::engine::{Ctx, Exchange};
use crate::matching::refresh_matches;

/// A request as seen by one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub request: ServiceRequest,
    /// Populated for the owner only.
    pub matches: Vec<SuggestedMatch>,
    /// Populated for the owner only.
    pub negotiations: Vec<Negotiation>,
    /// Matches created by this view.
    pub new_matches: usize,
}

impl Exchange {
    /// Post a request and immediately look for providers.
    ///
    /// Credit requests are checked against the current balance, but nothing
    /// is reserved until a match is accepted.
    ///
    /// # Errors
    /// - `AdminNotAllowed`, `AccountInactive`, `AccountSuspended` for
    ///   accounts that may not trade
    /// - `Validation` / `InvalidTerms` for incomplete input
    /// - `InsufficientCredits` if the balance cannot cover the amount
    pub fn create_request(&self, token: &str, input: &NewRequest) -> Result<RequestId> {
        self.run(|cx| {
            let user = cx.authenticate(token)?;
            user.ensure_can_trade(cx.now, "create requests")?;
            if input.title.trim().is_empty() {
                return Err(ExchangeError::validation("title is required"));
            }
            let skill_needed = normalize_skill(&input.skill_needed);
            if skill_needed.is_empty() {
                return Err(ExchangeError::validation("skill needed is required"));
            }
            let terms = input.terms()?;
            if let Terms::Credit { amount } = terms {
                let available = cx.db.ledger.balance(user.id);
                if available < amount {
                    return Err(ExchangeError::InsufficientCredits {
                        needed: amount,
                        available,
                    });
                }
            }

            let request = ServiceRequest {
                id: RequestId::new(),
                requester_id: user.id,
                title: input.title.trim().to_string(),
                description: input.description.trim().to_string(),
                skill_needed,
                terms,
                status: RequestStatus::Open,
                matched_provider_id: None,
                is_reported: false,
                created_at: cx.now,
                updated_at: cx.now,
            };
            let id = request.id;
            tracing::info!(req = %id, user = %user.id, mode = %request.exchange_mode(), "request created");
            cx.db.requests.insert(id, request);

            refresh_matches(cx, id)?;
            Ok(id)
        })
    }

    /// Look at a request. The owner's view of an open request refreshes
    /// its matches; other users see the request alone, and not at all while
    /// it is reported.
    ///
    /// # Errors
    /// `NotFound` for unknown or hidden requests.
    pub fn view_request(&self, token: &str, request_id: RequestId) -> Result<RequestView> {
        self.run(|cx| {
            let user = cx.authenticate(token)?;
            let request = cx.db.request(request_id)?;
            let is_owner = request.requester_id == user.id;
            if request.is_reported && !is_owner && !user.is_admin() {
                return Err(ExchangeError::not_found("Request", request_id));
            }

            let new_matches = if is_owner && request.is_open() {
                refresh_matches(cx, request_id)?
            } else {
                0
            };

            let request = cx.db.request(request_id)?.clone();
            let (matches, negotiations) = if is_owner {
                (
                    cx.db.matches_for_request(request_id, None).cloned().collect(),
                    cx.db.negotiations_for_request(request_id).cloned().collect(),
                )
            } else {
                (Vec::new(), Vec::new())
            };
            Ok(RequestView {
                request,
                matches,
                negotiations,
                new_matches,
            })
        })
    }

    /// Withdraw an open request. Pending matches and offers are rejected.
    ///
    /// # Errors
    /// `WrongParty` for non-owners, `InvalidState` unless the request is open.
    pub fn cancel_request(&self, token: &str, request_id: RequestId) -> Result<()> {
        self.run(|cx| {
            let user = cx.authenticate(token)?;
            let request = cx.db.request(request_id)?;
            if request.requester_id != user.id {
                return Err(ExchangeError::WrongParty {
                    expected: "requester",
                    action: "cancel this request",
                });
            }
            if !request.is_open() {
                return Err(ExchangeError::invalid_state("Request", "open", request.status));
            }
            cx.db
                .request_mut(request_id)?
                .set_status(RequestStatus::Cancelled, cx.now);
            close_open_offers(cx, request_id);
            tracing::info!(req = %request_id, "request cancelled");
            Ok(())
        })
    }
}

/// Reject every pending match and negotiation on a request.
pub(crate) fn close_open_offers(cx: &mut Ctx<'_>, request_id: RequestId) {
    let now = cx.now;
    for m in cx.db.matches.values_mut() {
        if m.request_id == request_id && m.status == MatchStatus::Pending {
            m.status = MatchStatus::Rejected;
        }
    }
    for n in cx.db.negotiations.values_mut() {
        if n.request_id == request_id && n.is_pending() {
            n.close(NegotiationStatus::Rejected, now);
        }
    }
}
