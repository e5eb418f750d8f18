//! Suggested matches and the counter-offer chain layered on top of them.
//!
//! ## Negotiation chain
//!
//! ```text
//!   requester offer ──▶ PENDING ──accept──▶ ACCEPTED  (transaction created)
//!                          │
//!                          ├──reject──▶ REJECTED
//!                          │
//!                          └──counter─▶ REJECTED (superseded)
//!                                        + new PENDING with swapped initiator
//! ```
//!
//! At most one negotiation per match is `Pending` at any instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MatchId, NegotiationId, RequestId, Terms, UserId};

/// Status of a system-generated suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A candidate provider for a request, scored by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedMatch {
    pub id: MatchId,
    pub request_id: RequestId,
    pub provider_id: UserId,
    pub match_score: u32,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

impl SuggestedMatch {
    #[must_use]
    pub fn new(
        request_id: RequestId,
        provider_id: UserId,
        match_score: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MatchId::new(),
            request_id,
            provider_id,
            match_score,
            status: MatchStatus::Pending,
            created_at: now,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == MatchStatus::Pending
    }
}

/// Which side of a match a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Requester,
    Provider,
}

impl PartyRole {
    /// The other side.
    #[must_use]
    pub fn counterpart(self) -> Self {
        match self {
            Self::Requester => Self::Provider,
            Self::Provider => Self::Requester,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requester => "requester",
            Self::Provider => "provider",
        }
    }
}

impl std::fmt::Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// One counter-offer in the chain for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Negotiation {
    pub id: NegotiationId,
    pub request_id: RequestId,
    pub match_id: MatchId,
    pub initiator_role: PartyRole,
    pub proposed_by: UserId,
    pub terms: Terms,
    pub message: Option<String>,
    pub status: NegotiationStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Negotiation {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == NegotiationStatus::Pending
    }

    /// The side that must answer this offer.
    #[must_use]
    pub fn recipient_role(&self) -> PartyRole {
        self.initiator_role.counterpart()
    }

    pub fn close(&mut self, status: NegotiationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.responded_at = Some(now);
    }
}

/// How the recipient answers a pending negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NegotiationResponse {
    Accept,
    Reject,
    Counter {
        terms: Terms,
        #[serde(default)]
        message: Option<String>,
    },
}
