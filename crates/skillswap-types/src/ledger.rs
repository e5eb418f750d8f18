//! Credit-history rows.
//!
//! Entries are immutable once written. For every user, replaying their
//! entries in creation order reproduces each `balance_after` exactly:
//!
//! ```text
//!   entry[n].balance_after == entry[n-1].balance_after + entry[n].amount
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Credits, EntryId, TransactionId, UserId};

/// Why a ledger row was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Provider credited on completion.
    Earned,
    /// Direct debit outside escrow.
    Spent,
    /// Escrow hold taken from the requester.
    Reserved,
    /// Escrow hold returned to the requester.
    Released,
    /// Opening balance.
    Initial,
    /// Admin correction.
    Adjustment,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Earned => write!(f, "earned"),
            Self::Spent => write!(f, "spent"),
            Self::Reserved => write!(f, "reserved"),
            Self::Released => write!(f, "released"),
            Self::Initial => write!(f, "initial"),
            Self::Adjustment => write!(f, "adjustment"),
        }
    }
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditHistoryEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub transaction_id: Option<TransactionId>,
    /// Signed: negative for holds and debits.
    pub amount: Credits,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub description: String,
    pub balance_after: Credits,
    pub created_at: DateTime<Utc>,
}
