//! Ratings and the three moderation pipelines: reports, disputes, and
//! fraud alerts.
//!
//! Each pipeline has its own status enum; all three share the same shape of
//! "waiting → (optionally in review) → resolved | dismissed".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    BlobRef, DisputeId, FraudAlertId, RatingId, ReportId, RequestId, TransactionId, UserId,
};

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// Feedback left by one party of a completed transaction about the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub transaction_id: TransactionId,
    pub rater_id: UserId,
    pub ratee_id: UserId,
    /// 1..=5
    pub score: u8,
    pub comment: String,
    /// Hidden by an upheld feedback report.
    pub is_reported: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What a report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ReportTarget {
    User(UserId),
    Request(RequestId),
    Rating(RatingId),
}

/// Discriminant of a [`ReportTarget`], as shown in the admin queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    User,
    Request,
    Feedback,
}

impl ReportTarget {
    #[must_use]
    pub fn report_type(&self) -> ReportType {
        match self {
            Self::User(_) => ReportType::User,
            Self::Request(_) => ReportType::Request,
            Self::Rating(_) => ReportType::Feedback,
        }
    }
}

impl std::fmt::Display for ReportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "{id}"),
            Self::Request(id) => write!(f, "{id}"),
            Self::Rating(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    /// Still waiting on an admin decision.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Reviewed)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Reviewed => write!(f, "reviewed"),
            Self::Resolved => write!(f, "resolved"),
            Self::Dismissed => write!(f, "dismissed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub reporter_id: UserId,
    pub target: ReportTarget,
    pub reason: String,
    pub description: String,
    pub status: ReportStatus,
    /// Transaction moved to `disputed` when this report was filed.
    pub paused_transaction_id: Option<TransactionId>,
    pub admin_note: Option<String>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Put the report back in the queue, clearing the decision.
    pub fn reopen(&mut self) {
        self.status = ReportStatus::Pending;
        self.admin_note = None;
        self.resolved_by = None;
        self.resolved_at = None;
    }
}

// ---------------------------------------------------------------------------
// Disputes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
    Dismissed,
}

impl DisputeStatus {
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::UnderReview)
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::UnderReview => write!(f, "under_review"),
            Self::Resolved => write!(f, "resolved"),
            Self::Dismissed => write!(f, "dismissed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub id: DisputeId,
    pub transaction_id: TransactionId,
    pub filed_by: UserId,
    pub reason: String,
    pub description: String,
    pub evidence: Option<BlobRef>,
    pub status: DisputeStatus,
    pub admin_note: Option<String>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Dispute {
    pub fn reopen(&mut self) {
        self.status = DisputeStatus::Open;
        self.admin_note = None;
        self.resolved_by = None;
        self.resolved_at = None;
    }
}

// ---------------------------------------------------------------------------
// Fraud alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudAlertType {
    UnusualVolume,
    RepeatedTransfers,
    SuspiciousPattern,
}

impl std::fmt::Display for FraudAlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnusualVolume => write!(f, "unusual_volume"),
            Self::RepeatedTransfers => write!(f, "repeated_transfers"),
            Self::SuspiciousPattern => write!(f, "suspicious_pattern"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudAlertStatus {
    Pending,
    Investigating,
    Resolved,
    Dismissed,
}

impl FraudAlertStatus {
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Investigating)
    }
}

impl std::fmt::Display for FraudAlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Investigating => write!(f, "investigating"),
            Self::Resolved => write!(f, "resolved"),
            Self::Dismissed => write!(f, "dismissed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAlert {
    pub id: FraudAlertId,
    pub user_id: UserId,
    pub alert_type: FraudAlertType,
    pub severity: Severity,
    pub description: String,
    /// Window transactions that tripped the rule.
    pub evidence: Vec<TransactionId>,
    pub status: FraudAlertStatus,
    pub admin_note: Option<String>,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl FraudAlert {
    pub fn reopen(&mut self) {
        self.status = FraudAlertStatus::Pending;
        self.admin_note = None;
        self.resolved_by = None;
        self.resolved_at = None;
    }
}
