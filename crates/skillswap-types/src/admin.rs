//! The admin action journal's row type.
//!
//! Rows are append-only. The only mutation ever applied to a stored row is
//! the one-shot `is_undone` flip performed by an undo, which itself appends
//! a fresh row pointing back via `reverses`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AdminActionId, DisputeId, FraudAlertId, ReportId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminActionType {
    UserSuspended,
    UserPardoned,
    UserActivated,
    UserDeactivated,
    ReportReviewed,
    ReportResolved,
    ReportDismissed,
    ReportReopened,
    DisputeUnderReview,
    DisputeResolved,
    DisputeDismissed,
    DisputeReopened,
    FraudInvestigating,
    FraudResolved,
    FraudDismissed,
    FraudReopened,
    CreditsAdjusted,
}

impl AdminActionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserSuspended => "user_suspended",
            Self::UserPardoned => "user_pardoned",
            Self::UserActivated => "user_activated",
            Self::UserDeactivated => "user_deactivated",
            Self::ReportReviewed => "report_reviewed",
            Self::ReportResolved => "report_resolved",
            Self::ReportDismissed => "report_dismissed",
            Self::ReportReopened => "report_reopened",
            Self::DisputeUnderReview => "dispute_under_review",
            Self::DisputeResolved => "dispute_resolved",
            Self::DisputeDismissed => "dispute_dismissed",
            Self::DisputeReopened => "dispute_reopened",
            Self::FraudInvestigating => "fraud_investigating",
            Self::FraudResolved => "fraud_resolved",
            Self::FraudDismissed => "fraud_dismissed",
            Self::FraudReopened => "fraud_reopened",
            Self::CreditsAdjusted => "credits_adjusted",
        }
    }
}

impl std::fmt::Display for AdminActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The moderation record an action was taken on, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum RelatedEntity {
    Report(ReportId),
    Dispute(DisputeId),
    FraudAlert(FraudAlertId),
}

/// A journal row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAction {
    pub id: AdminActionId,
    pub admin_id: UserId,
    pub action_type: AdminActionType,
    pub target_user_id: Option<UserId>,
    pub related: Option<RelatedEntity>,
    pub details: String,
    pub suspend_days: Option<u32>,
    pub is_undone: bool,
    pub undone_at: Option<DateTime<Utc>>,
    pub undone_by: Option<UserId>,
    /// Set on rows written by an undo.
    pub reverses: Option<AdminActionId>,
    pub created_at: DateTime<Utc>,
}

/// Builder for a row about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdminAction {
    pub admin_id: UserId,
    pub action_type: AdminActionType,
    pub target_user_id: Option<UserId>,
    pub related: Option<RelatedEntity>,
    pub details: String,
    pub suspend_days: Option<u32>,
    pub reverses: Option<AdminActionId>,
}

impl NewAdminAction {
    #[must_use]
    pub fn new(admin_id: UserId, action_type: AdminActionType, details: impl Into<String>) -> Self {
        Self {
            admin_id,
            action_type,
            target_user_id: None,
            related: None,
            details: details.into(),
            suspend_days: None,
            reverses: None,
        }
    }

    #[must_use]
    pub fn target(mut self, user: UserId) -> Self {
        self.target_user_id = Some(user);
        self
    }

    #[must_use]
    pub fn related(mut self, related: RelatedEntity) -> Self {
        self.related = Some(related);
        self
    }

    #[must_use]
    pub fn suspend_days(mut self, days: u32) -> Self {
        self.suspend_days = Some(days);
        self
    }

    #[must_use]
    pub fn reversing(mut self, original: AdminActionId) -> Self {
        self.reverses = Some(original);
        self
    }

    #[must_use]
    pub fn into_action(self, id: AdminActionId, now: DateTime<Utc>) -> AdminAction {
        AdminAction {
            id,
            admin_id: self.admin_id,
            action_type: self.action_type,
            target_user_id: self.target_user_id,
            related: self.related,
            details: self.details,
            suspend_days: self.suspend_days,
            is_undone: false,
            undone_at: None,
            undone_by: None,
            reverses: self.reverses,
            created_at: now,
        }
    }
}
