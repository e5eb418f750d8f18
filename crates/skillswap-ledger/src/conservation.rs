//! Credit conservation invariant checker.
//!
//! Credits only enter or leave circulation through opening balances and
//! admin adjustments. Everything else moves them between accounts and
//! escrow:
//! ```text
//! Σ(balances) + Σ(held escrow) == Σ(minted) - Σ(burned)
//! ```

use serde::{Deserialize, Serialize};
use skillswap_types::{Credits, ExchangeError, Result};

/// Tracks credits minted and burned since genesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditConservation {
    minted: Credits,
    burned: Credits,
}

impl CreditConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record credits entering circulation.
    ///
    /// # Errors
    /// `CreditOverflow` if the minted total would leave the `i64` range;
    /// nothing is recorded in that case.
    pub fn record_mint(&mut self, amount: Credits) -> Result<()> {
        self.minted = self.minted.checked_add(amount).ok_or_else(|| {
            ExchangeError::CreditOverflow {
                reason: format!("minting {amount} exceeds the credit supply limit"),
            }
        })?;
        Ok(())
    }

    /// Whether `amount` more credits can be minted.
    #[must_use]
    pub fn can_mint(&self, amount: Credits) -> bool {
        self.minted.checked_add(amount).is_some()
    }

    /// Record credits leaving circulation.
    ///
    /// # Errors
    /// `CreditOverflow` if the burned total would leave the `i64` range.
    pub fn record_burn(&mut self, amount: Credits) -> Result<()> {
        self.burned = self.burned.checked_add(amount).ok_or_else(|| {
            ExchangeError::CreditOverflow {
                reason: format!("burning {amount} exceeds the burn counter limit"),
            }
        })?;
        Ok(())
    }

    #[must_use]
    pub fn expected_supply(&self) -> Credits {
        self.minted - self.burned
    }

    #[must_use]
    pub fn total_minted(&self) -> Credits {
        self.minted
    }

    #[must_use]
    pub fn total_burned(&self) -> Credits {
        self.burned
    }

    /// Verify the actual supply against the expected supply.
    ///
    /// # Errors
    /// Returns [`ExchangeError::ConservationViolation`] if they differ.
    pub fn verify(&self, actual_supply: Credits) -> Result<()> {
        let expected = self.expected_supply();
        if actual_supply != expected {
            return Err(ExchangeError::ConservationViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {expected} \
                     (minted={}, burned={})",
                    self.minted, self.burned
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let cc = CreditConservation::new();
        assert_eq!(cc.expected_supply(), 0);
        assert!(cc.verify(0).is_ok());
    }

    #[test]
    fn mints_and_burns_move_expected() {
        let mut cc = CreditConservation::new();
        cc.record_mint(100).unwrap();
        cc.record_mint(100).unwrap();
        cc.record_burn(25).unwrap();
        assert_eq!(cc.expected_supply(), 175);
        assert!(cc.verify(175).is_ok());
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut cc = CreditConservation::new();
        cc.record_mint(100).unwrap();
        let err = cc.verify(130).unwrap_err();
        assert!(matches!(err, ExchangeError::ConservationViolation { .. }));
    }

    #[test]
    fn mint_past_the_limit_is_refused() {
        let mut cc = CreditConservation::new();
        cc.record_mint(100).unwrap();
        assert!(!cc.can_mint(Credits::MAX));
        let err = cc.record_mint(Credits::MAX).unwrap_err();
        assert!(matches!(err, ExchangeError::CreditOverflow { .. }));
        assert_eq!(cc.total_minted(), 100);
    }
}
