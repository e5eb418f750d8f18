//! # skillswap-ledger
//!
//! **Credit plane**: balances, append-only credit history, per-transaction
//! escrow, and the conservation invariant.
//!
//! ## Architecture
//!
//! 1. **CreditLedger**: the only owner of balances; every mutation writes
//!    exactly one history row
//! 2. **EscrowHold**: credits parked for one transaction, `HELD` until
//!    released to the payer or settled to the payee
//! 3. **CreditConservation**: minted minus burned must equal balances plus
//!    held escrow
//!
//! ## Credit Flow
//!
//! ```text
//! open_account ─▶ balance ─reserve─▶ HELD ─settle──▶ payee balance
//!                    ▲                 │
//!                    └────release──────┘
//! ```

pub mod conservation;
pub mod credit_ledger;
pub mod escrow;

pub use conservation::CreditConservation;
pub use credit_ledger::CreditLedger;
pub use escrow::{EscrowHold, EscrowState};
