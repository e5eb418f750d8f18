//! The escrow-and-fulfilment unit created once terms are agreed.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐ start ┌─────────────┐ both confirm ┌───────────┐
//!   │ PENDING ├──────▶│ IN_PROGRESS ├─────────────▶│ COMPLETED │
//!   └─┬───┬───┘       └──────┬──────┘              └───────────┘
//!     │   │ report           │ dispute                   ▲
//!     │   ▼                  ▼                           │ admin complete
//!     │ ┌──────────────────────────┐─────────────────────┘
//!     │ │         DISPUTED         │── dismiss ──▶ PENDING / IN_PROGRESS
//!     │ └────────────┬─────────────┘
//!     │ cancel/reject│ report upheld
//!     ▼              ▼
//!  CANCELLED      REVERSED
//! ```
//!
//! `Disputed` is a pause, not a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MatchId, NegotiationId, PartyRole, RequestId, Terms, TransactionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    InProgress,
    Completed,
    Disputed,
    Cancelled,
    Reversed,
}

impl TransactionStatus {
    /// Terminal states: escrow must be fully released or transferred.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Reversed)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Disputed => write!(f, "disputed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Reversed => write!(f, "reversed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub request_id: RequestId,
    pub match_id: MatchId,
    /// Set when the terms came from an accepted counter-offer.
    pub negotiation_id: Option<NegotiationId>,
    pub requester_id: UserId,
    pub provider_id: UserId,
    /// Snapshot of the agreed terms.
    pub terms: Terms,
    pub status: TransactionStatus,
    pub requester_confirmed: bool,
    pub provider_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Which side `user` is on, if either.
    #[must_use]
    pub fn party_of(&self, user: UserId) -> Option<PartyRole> {
        if user == self.requester_id {
            Some(PartyRole::Requester)
        } else if user == self.provider_id {
            Some(PartyRole::Provider)
        } else {
            None
        }
    }

    /// The user on `role`'s side.
    #[must_use]
    pub fn party(&self, role: PartyRole) -> UserId {
        match role {
            PartyRole::Requester => self.requester_id,
            PartyRole::Provider => self.provider_id,
        }
    }

    #[must_use]
    pub fn counterparty(&self, role: PartyRole) -> UserId {
        match role {
            PartyRole::Requester => self.provider_id,
            PartyRole::Provider => self.requester_id,
        }
    }

    #[must_use]
    pub fn is_confirmed_by(&self, role: PartyRole) -> bool {
        match role {
            PartyRole::Requester => self.requester_confirmed,
            PartyRole::Provider => self.provider_confirmed,
        }
    }

    pub fn confirm(&mut self, role: PartyRole) {
        match role {
            PartyRole::Requester => self.requester_confirmed = true,
            PartyRole::Provider => self.provider_confirmed = true,
        }
    }

    #[must_use]
    pub fn fully_confirmed(&self) -> bool {
        self.requester_confirmed && self.provider_confirmed
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Transaction {
    /// A credit transaction between two parties, created at `now`.
    pub fn dummy_credit(
        requester_id: UserId,
        provider_id: UserId,
        amount: crate::Credits,
        status: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            request_id: RequestId::new(),
            match_id: MatchId::new(),
            negotiation_id: None,
            requester_id,
            provider_id,
            terms: Terms::Credit { amount },
            status,
            requester_confirmed: false,
            provider_confirmed: false,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::dummy_credit(
            UserId::new(),
            UserId::new(),
            30,
            TransactionStatus::InProgress,
            Utc::now(),
        )
    }

    #[test]
    fn party_resolution() {
        let tx = sample();
        assert_eq!(tx.party_of(tx.requester_id), Some(PartyRole::Requester));
        assert_eq!(tx.party_of(tx.provider_id), Some(PartyRole::Provider));
        assert_eq!(tx.party_of(UserId::new()), None);
        assert_eq!(tx.counterparty(PartyRole::Requester), tx.provider_id);
    }

    #[test]
    fn confirmation_needs_both_sides() {
        let mut tx = sample();
        tx.confirm(PartyRole::Provider);
        assert!(tx.is_confirmed_by(PartyRole::Provider));
        assert!(!tx.fully_confirmed());
        tx.confirm(PartyRole::Requester);
        assert!(tx.fully_confirmed());
    }

    #[test]
    fn terminal_states() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Reversed.is_terminal());
        assert!(!TransactionStatus::Disputed.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
    }
}
