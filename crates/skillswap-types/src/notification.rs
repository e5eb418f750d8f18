//! Messages handed to the notification sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MatchesFound,
    NegotiationReceived,
    NegotiationAccepted,
    NegotiationRejected,
    MatchAccepted,
    TransactionStarted,
    CompletionConfirmed,
    TransactionCompleted,
    TransactionCancelled,
    TransactionRejected,
    TransactionReported,
    TransactionResumed,
    TransactionReversed,
    DisputeOpened,
    DisputeUpdated,
    ReportUpdated,
    RatingReceived,
    AccountSuspended,
    AccountPardoned,
    AccountStatusChanged,
    CreditsAdjusted,
    FraudAlert,
}

/// "Deliver message M to user U."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
    /// Display form of the entity the message is about.
    pub related_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            kind,
            message: message.into(),
            related_id: None,
            created_at: now,
        }
    }

    #[must_use]
    pub fn about(mut self, related: impl std::fmt::Display) -> Self {
        self.related_id = Some(related.to_string());
        self
    }
}
