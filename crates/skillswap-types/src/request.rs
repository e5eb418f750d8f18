//! Service requests, skills, and the exchange terms they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Credits, ExchangeError, RequestId, Result, SkillId, UserId};

/// Canonical form of a skill name used for matching: trimmed and lower-cased.
#[must_use]
pub fn normalize_skill(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// Self-declared proficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Expert,
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Expert => write!(f, "expert"),
        }
    }
}

/// A skill a user offers to provide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecord {
    pub id: SkillId,
    pub user_id: UserId,
    /// Normalized name (see [`normalize_skill`]).
    pub name: String,
    pub level: SkillLevel,
    pub endorsements: u32,
}

impl SkillRecord {
    #[must_use]
    pub fn new(user_id: UserId, name: &str, level: SkillLevel, endorsements: u32) -> Self {
        Self {
            id: SkillId::new(),
            user_id,
            name: normalize_skill(name),
            level,
            endorsements,
        }
    }
}

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

/// How a request is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeMode {
    Credit,
    SkillSwap,
}

impl std::fmt::Display for ExchangeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credit => write!(f, "credit"),
            Self::SkillSwap => write!(f, "skill_swap"),
        }
    }
}

/// The agreed (or proposed) consideration for an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Terms {
    /// The requester pays `amount` credits, held in escrow until completion.
    Credit { amount: Credits },
    /// The requester provides `offered` in exchange for `requested`.
    SkillSwap { offered: String, requested: String },
}

impl Terms {
    #[must_use]
    pub fn mode(&self) -> ExchangeMode {
        match self {
            Self::Credit { .. } => ExchangeMode::Credit,
            Self::SkillSwap { .. } => ExchangeMode::SkillSwap,
        }
    }

    /// Credits that move when these terms settle, if any.
    #[must_use]
    pub fn credit_amount(&self) -> Option<Credits> {
        match self {
            Self::Credit { amount } => Some(*amount),
            Self::SkillSwap { .. } => None,
        }
    }

    /// Check the terms are complete for their mode.
    ///
    /// # Errors
    /// `InvalidTerms` for a non-positive amount or a blank skill.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Credit { amount } if *amount <= 0 => Err(ExchangeError::InvalidTerms {
                reason: format!("credit amount must be positive, got {amount}"),
            }),
            Self::SkillSwap { offered, requested }
                if offered.trim().is_empty() || requested.trim().is_empty() =>
            {
                Err(ExchangeError::InvalidTerms {
                    reason: "skill swap requires both an offered and a requested skill".into(),
                })
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Service request
// ---------------------------------------------------------------------------

/// Lifecycle of a service request.
///
/// Moves forward `Open → Matched → InProgress → Completed`, with `Cancelled`
/// as a terminal side exit. The only backward edge is `Matched → Open`
/// (rejection, provider counter-offer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    Matched,
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Matched => write!(f, "matched"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Input for posting a new request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    pub skill_needed: String,
    pub exchange_mode: ExchangeMode,
    #[serde(default)]
    pub credit_amount: Option<Credits>,
    #[serde(default)]
    pub skill_offered: Option<String>,
}

impl NewRequest {
    /// Terms implied by the request's exchange mode.
    ///
    /// # Errors
    /// `Validation` when a field the mode requires is missing, `InvalidTerms`
    /// when the resulting terms are invalid.
    pub fn terms(&self) -> Result<Terms> {
        let terms = match self.exchange_mode {
            ExchangeMode::Credit => Terms::Credit {
                amount: self
                    .credit_amount
                    .ok_or_else(|| ExchangeError::validation("credit amount is required"))?,
            },
            ExchangeMode::SkillSwap => Terms::SkillSwap {
                offered: self
                    .skill_offered
                    .as_deref()
                    .map(normalize_skill)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ExchangeError::validation("offered skill is required"))?,
                requested: normalize_skill(&self.skill_needed),
            },
        };
        terms.validate()?;
        Ok(terms)
    }
}

/// A posted request for a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub title: String,
    pub description: String,
    /// Normalized skill name.
    pub skill_needed: String,
    pub terms: Terms,
    pub status: RequestStatus,
    pub matched_provider_id: Option<UserId>,
    /// Hidden from other users while a report is pending or upheld.
    pub is_reported: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    #[must_use]
    pub fn exchange_mode(&self) -> ExchangeMode {
        self.terms.mode()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Open
    }

    /// Return the request to the matching pool.
    pub fn reopen(&mut self, now: DateTime<Utc>) {
        self.status = RequestStatus::Open;
        self.matched_provider_id = None;
        self.updated_at = now;
    }

    pub fn set_status(&mut self, status: RequestStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}
