//! Marketplace participants.
//!
//! The credit balance is deliberately absent from [`User`]: the ledger owns
//! it, and [`UserProfile`] joins the two for reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Credits, ExchangeError, Result, UserId};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Identity and standing of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    /// Set by moderation; the account is gated while this lies in the future.
    pub suspended_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(display_name: impl Into<String>, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            display_name: display_name.into(),
            role,
            is_active: true,
            suspended_until: None,
            created_at: now,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn is_suspended(&self, now: DateTime<Utc>) -> bool {
        self.suspended_until.is_some_and(|until| until > now)
    }

    /// Check that this account may enter new exchanges.
    ///
    /// # Errors
    /// `AdminNotAllowed` for admins, `AccountInactive` for deactivated
    /// accounts, `AccountSuspended` while a suspension is running.
    pub fn ensure_can_trade(&self, now: DateTime<Utc>, action: &'static str) -> Result<()> {
        if self.is_admin() {
            return Err(ExchangeError::AdminNotAllowed { action });
        }
        if !self.is_active {
            return Err(ExchangeError::AccountInactive);
        }
        if let Some(until) = self.suspended_until.filter(|until| *until > now) {
            return Err(ExchangeError::AccountSuspended {
                until: until.to_rfc3339(),
            });
        }
        Ok(())
    }
}

/// Read model: a user together with their current balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
    pub credits: Credits,
    pub is_active: bool,
    pub suspended_until: Option<DateTime<Utc>>,
}
