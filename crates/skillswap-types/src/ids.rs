//! Globally unique identifiers used throughout SkillSwap.
//!
//! All entity IDs are UUIDv7, so sorting by ID is sorting by creation time.
//! The record store relies on this for its "monotonic creation order"
//! iteration guarantee.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUIDv7-backed identifier newtype with a display prefix.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// A marketplace participant (regular user or admin).
    UserId,
    "user"
);
entity_id!(
    /// A skill a user can provide.
    SkillId,
    "skill"
);
entity_id!(
    /// A posted service request.
    RequestId,
    "req"
);
entity_id!(
    /// A system-generated (request, provider) suggestion.
    MatchId,
    "match"
);
entity_id!(
    /// One counter-offer in a negotiation chain.
    NegotiationId,
    "neg"
);
entity_id!(
    /// An escrowed exchange between a requester and a provider.
    TransactionId,
    "tx"
);
entity_id!(
    /// A single credit-history ledger row.
    EntryId,
    "entry"
);
entity_id!(
    /// Feedback left by one party of a completed transaction.
    RatingId,
    "rating"
);
entity_id!(ReportId, "report");
entity_id!(DisputeId, "dispute");
entity_id!(FraudAlertId, "fraud");
entity_id!(
    /// A row in the append-only admin journal.
    AdminActionId,
    "action"
);

/// Opaque reference to an attachment held by blob storage.
///
/// The engine never dereferences it; it is stored and echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(pub String);

impl BlobRef {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(UserId::new(), UserId::new());
        assert_ne!(TransactionId::new(), TransactionId::new());
    }

    #[test]
    fn ids_sort_by_creation() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert!(a < b);
    }

    #[test]
    fn display_carries_prefix() {
        let id = TransactionId::new();
        assert!(id.to_string().starts_with("tx:"));
        assert!(ReportId::new().to_string().starts_with("report:"));
    }

    #[test]
    fn ids_serialize_as_plain_uuid() {
        let id = MatchId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
        let back: MatchId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn blank_blob_ref_is_empty() {
        assert!(BlobRef::new("  ").is_empty());
        assert!(!BlobRef::new("evidence-1").is_empty());
    }
}
