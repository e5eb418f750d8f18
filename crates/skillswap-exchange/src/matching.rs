//! Suggested matches: generation and the requester's accept/decline.
//!
//! Generation runs on three triggers (request creation, the owner viewing
//! an open request, and the scheduled sweep) and is idempotent across all
//! of them: a provider already matched to a request is never matched again.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use skillswap_matchcore::suggest_providers;
use skillswap_types::{
    ExchangeError, MatchId, MatchStatus, NegotiationStatus, NotificationKind, RequestId, Result,
    SuggestedMatch, TransactionId, UserId,
};

use crate::engine::{Ctx, Exchange};
use crate::transactions::{Agreement, create_transaction};

impl Exchange {
    /// Scheduled sweep: refresh matches for every open request.
    ///
    /// # Errors
    /// Whatever a request refresh fails with; the sweep commits nothing then.
    pub fn find_new_matches_for_open_requests(&self) -> Result<usize> {
        self.find_new_matches_for_open_requests_at(self.now())
    }

    /// [`Self::find_new_matches_for_open_requests`] with an explicit `now`.
    pub fn find_new_matches_for_open_requests_at(&self, now: DateTime<Utc>) -> Result<usize> {
        self.run(|cx| {
            cx.now = now;
            let open: Vec<RequestId> = cx
                .db
                .requests
                .values()
                .filter(|r| r.is_open() && !r.is_reported)
                .map(|r| r.id)
                .collect();
            let mut created = 0;
            for id in &open {
                created += refresh_matches(cx, *id)?;
            }
            tracing::info!(requests = open.len(), created, "matching sweep finished");
            Ok(created)
        })
    }

    /// Accept a suggestion on the request's original terms.
    ///
    /// # Errors
    /// - `WrongParty` unless the caller owns the request
    /// - `AlreadyProcessed` if the match is no longer pending
    /// - `InvalidState` if the request is no longer open
    /// - `InsufficientCredits` if the escrow cannot be funded
    pub fn accept_match(&self, token: &str, match_id: MatchId) -> Result<TransactionId> {
        self.run(|cx| {
            let user = cx.authenticate(token)?;
            user.ensure_can_trade(cx.now, "accept matches")?;
            let m = cx.db.suggested_match(match_id)?;
            let request = cx.db.request(m.request_id)?;
            if request.requester_id != user.id {
                return Err(ExchangeError::WrongParty {
                    expected: "requester",
                    action: "accept this match",
                });
            }
            if !m.is_pending() {
                return Err(ExchangeError::AlreadyProcessed { entity: "Match" });
            }
            if !request.is_open() {
                return Err(ExchangeError::invalid_state("Request", "open", request.status));
            }
            let agreement = Agreement {
                request_id: request.id,
                match_id,
                negotiation_id: None,
                requester_id: request.requester_id,
                provider_id: m.provider_id,
                terms: request.terms.clone(),
            };
            create_transaction(cx, agreement)
        })
    }

    /// Decline a single suggestion. Any live offer on it is closed too.
    ///
    /// # Errors
    /// `WrongParty` unless the caller owns the request, `AlreadyProcessed`
    /// if the match is no longer pending.
    pub fn reject_match(&self, token: &str, match_id: MatchId) -> Result<()> {
        self.run(|cx| {
            let user = cx.authenticate(token)?;
            let m = cx.db.suggested_match(match_id)?;
            if cx.db.request(m.request_id)?.requester_id != user.id {
                return Err(ExchangeError::WrongParty {
                    expected: "requester",
                    action: "decline this match",
                });
            }
            if !m.is_pending() {
                return Err(ExchangeError::AlreadyProcessed { entity: "Match" });
            }
            cx.db.suggested_match_mut(match_id)?.status = MatchStatus::Rejected;
            let now = cx.now;
            for n in cx.db.negotiations.values_mut() {
                if n.match_id == match_id && n.is_pending() {
                    n.close(NegotiationStatus::Rejected, now);
                }
            }
            tracing::info!(%match_id, "match declined");
            Ok(())
        })
    }
}

/// Score and insert matches for providers not yet matched to `request_id`.
/// Returns how many were created; the requester is notified when any were.
pub(crate) fn refresh_matches(cx: &mut Ctx<'_>, request_id: RequestId) -> Result<usize> {
    let request = cx.db.request(request_id)?;
    if !request.is_open() {
        return Ok(0);
    }

    let already: HashSet<UserId> = cx
        .db
        .matches_for_request(request_id, None)
        .map(|m| m.provider_id)
        .collect();
    let now = cx.now;
    let eligible = cx.db.skills.values().filter(|s| {
        cx.db
            .users
            .get(&s.user_id)
            .is_some_and(|u| u.is_active && !u.is_admin() && !u.is_suspended(now))
    });
    let candidates = suggest_providers(request, eligible, &already, &cx.config.matching);
    let requester = request.requester_id;
    if candidates.is_empty() {
        return Ok(0);
    }

    for c in &candidates {
        let m = SuggestedMatch::new(request_id, c.provider_id, c.score, now);
        tracing::debug!(req = %request_id, provider = %c.provider_id, score = c.score, "match suggested");
        cx.db.matches.insert(m.id, m);
    }
    let count = candidates.len();
    cx.notify(
        requester,
        NotificationKind::MatchesFound,
        format!("{count} new provider(s) found for your request"),
        request_id,
    );
    Ok(count)
}
