//! # Escrow holds
//!
//! A hold is taken from the requester the instant a credit transaction is
//! created and closed exactly once when the transaction ends.
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐  completion   ┌─────────┐
//!   │ HELD ├──────────────▶│ SETTLED │   (credited to the provider)
//!   └──┬───┘               └─────────┘
//!      │ cancel/reject/reverse
//!      ▼
//!   ┌──────────┐
//!   │ RELEASED │   (returned to the requester)
//!   └──────────┘
//! ```
//!
//! Transitions are monotonic. A closed hold can never be closed again, which
//! is what makes forced completion by an admin safe to apply after the
//! parties already confirmed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillswap_types::{Credits, ExchangeError, Result, TransactionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowState {
    /// Credits debited from the payer and parked.
    Held,
    /// Credits returned to the payer. **Irreversible.**
    Released,
    /// Credits paid to the payee. **Irreversible.**
    Settled,
}

impl EscrowState {
    /// Can this hold transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Held, Self::Released | Self::Settled))
    }
}

impl std::fmt::Display for EscrowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Held => write!(f, "HELD"),
            Self::Released => write!(f, "RELEASED"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// Credits parked for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowHold {
    pub transaction_id: TransactionId,
    pub payer: UserId,
    pub amount: Credits,
    pub state: EscrowState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl EscrowHold {
    #[must_use]
    pub fn new(
        transaction_id: TransactionId,
        payer: UserId,
        amount: Credits,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id,
            payer,
            amount,
            state: EscrowState::Held,
            created_at: now,
            closed_at: None,
        }
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.state == EscrowState::Held
    }

    /// Move the hold to a closed state.
    ///
    /// # Errors
    /// Returns `EscrowNotHeld` if the hold is already closed.
    pub fn close(&mut self, target: EscrowState, now: DateTime<Utc>) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(ExchangeError::EscrowNotHeld {
                transaction: self.transaction_id.to_string(),
                state: self.state.to_string(),
            });
        }
        self.state = target;
        self.closed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold() -> EscrowHold {
        EscrowHold::new(TransactionId::new(), UserId::new(), 30, Utc::now())
    }

    #[test]
    fn held_to_settled() {
        let mut h = hold();
        assert!(h.is_held());
        h.close(EscrowState::Settled, Utc::now()).unwrap();
        assert_eq!(h.state, EscrowState::Settled);
        assert!(h.closed_at.is_some());
    }

    #[test]
    fn held_to_released() {
        let mut h = hold();
        h.close(EscrowState::Released, Utc::now()).unwrap();
        assert_eq!(h.state, EscrowState::Released);
    }

    #[test]
    fn closed_hold_cannot_close_again() {
        let mut h = hold();
        h.close(EscrowState::Settled, Utc::now()).unwrap();
        let err = h.close(EscrowState::Released, Utc::now()).unwrap_err();
        assert!(matches!(err, ExchangeError::EscrowNotHeld { .. }));
        assert!(h.close(EscrowState::Settled, Utc::now()).is_err());
    }

    #[test]
    fn transitions_are_monotonic() {
        assert!(EscrowState::Held.can_transition_to(EscrowState::Released));
        assert!(EscrowState::Held.can_transition_to(EscrowState::Settled));
        assert!(!EscrowState::Held.can_transition_to(EscrowState::Held));
        assert!(!EscrowState::Released.can_transition_to(EscrowState::Held));
        assert!(!EscrowState::Settled.can_transition_to(EscrowState::Released));
    }
}
