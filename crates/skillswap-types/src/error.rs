//! Error types for the SkillSwap exchange engine.
//!
//! All errors use the `SX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by failure category:
//! - 1xx: Authorization (session, role, wrong party)
//! - 2xx: State preconditions (entity not in the required status)
//! - 3xx: Business rules (credits, terms, account standing)
//! - 4xx: Not found
//! - 5xx: Irrecoverable admin requests
//! - 6xx: Ledger / escrow integrity
//! - 9xx: General / internal errors
//!
//! Every variant is surfaced to callers as a plain message; nothing in the
//! engine panics on bad input.

use thiserror::Error;

use crate::Credits;

/// Coarse failure category, used by callers that branch on the kind of
/// failure rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authorization,
    Precondition,
    BusinessRule,
    NotFound,
    Irrecoverable,
    Integrity,
    Internal,
}

/// Central error enum for all SkillSwap operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    // =================================================================
    // Authorization (1xx)
    // =================================================================
    /// The session token is unknown, expired, or belongs to a disabled account.
    #[error("SX_ERR_100: Invalid or expired session")]
    InvalidSession,

    /// The caller is authenticated but may not perform this call.
    #[error("SX_ERR_101: Forbidden: {reason}")]
    Forbidden { reason: String },

    /// The call requires the admin role.
    #[error("SX_ERR_102: Admin privileges required")]
    AdminRequired,

    /// The caller is not the party this step belongs to.
    #[error("SX_ERR_103: Only the {expected} may {action}")]
    WrongParty {
        expected: &'static str,
        action: &'static str,
    },

    // =================================================================
    // State preconditions (2xx)
    // =================================================================
    /// The entity is not in a status that allows the operation.
    #[error("SX_ERR_200: {entity} is {actual}, expected {expected}")]
    InvalidState {
        entity: &'static str,
        expected: String,
        actual: String,
    },

    /// The item was already handled.
    #[error("SX_ERR_201: {entity} has already been processed")]
    AlreadyProcessed { entity: &'static str },

    /// A live counter-offer already exists for this match.
    #[error("SX_ERR_202: A pending negotiation already exists for this match")]
    NegotiationPending,

    /// The party has already confirmed completion.
    #[error("SX_ERR_203: Completion already confirmed by the {party}")]
    AlreadyConfirmed { party: &'static str },

    /// A dispute for this transaction is still open.
    #[error("SX_ERR_204: An open dispute already exists for this transaction")]
    DisputeAlreadyOpen,

    /// The rater has already rated this transaction.
    #[error("SX_ERR_205: Transaction already rated by this user")]
    AlreadyRated,

    // =================================================================
    // Business rules (3xx)
    // =================================================================
    /// The payer cannot cover the amount.
    #[error("SX_ERR_300: Insufficient credits: need {needed}, have {available}")]
    InsufficientCredits { needed: Credits, available: Credits },

    /// Exchange terms are incomplete or invalid for their mode.
    #[error("SX_ERR_301: Invalid terms: {reason}")]
    InvalidTerms { reason: String },

    /// A required field is missing or malformed.
    #[error("SX_ERR_302: Validation failed: {reason}")]
    Validation { reason: String },

    /// The account is suspended until the given time.
    #[error("SX_ERR_303: Account suspended until {until}")]
    AccountSuspended { until: String },

    /// The account has been deactivated.
    #[error("SX_ERR_304: Account is deactivated")]
    AccountInactive,

    /// Admin accounts cannot take part in exchanges.
    #[error("SX_ERR_305: Admins cannot {action}")]
    AdminNotAllowed { action: &'static str },

    // =================================================================
    // Not found (4xx)
    // =================================================================
    /// A referenced entity does not exist (or is hidden from the caller).
    #[error("SX_ERR_400: {entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    // =================================================================
    // Irrecoverable admin requests (5xx)
    // =================================================================
    /// The admin action has no faithful inverse.
    #[error("SX_ERR_500: Action {action} cannot be undone: {reason}")]
    Irreversible { action: String, reason: String },

    /// The admin action was already reversed.
    #[error("SX_ERR_501: Action already undone")]
    AlreadyUndone,

    // =================================================================
    // Ledger / escrow integrity (6xx)
    // =================================================================
    /// No escrow hold exists for the transaction.
    #[error("SX_ERR_600: No escrow held for {0}")]
    EscrowNotFound(String),

    /// The escrow hold was already released or settled.
    #[error("SX_ERR_601: Escrow for {transaction} is {state}, not HELD")]
    EscrowNotHeld { transaction: String, state: String },

    /// A ledger mutation would drive a balance negative.
    #[error("SX_ERR_602: Balance underflow for {user}")]
    BalanceUnderflow { user: String },

    /// Replaying the ledger does not reproduce a cached balance.
    #[error("SX_ERR_603: Ledger inconsistency: {reason}")]
    LedgerInconsistency { reason: String },

    /// Total credits in circulation changed without a mint.
    #[error("SX_ERR_604: Credit conservation violated: {reason}")]
    ConservationViolation { reason: String },

    /// A credit amount does not fit the ledger's integer range.
    #[error("SX_ERR_605: Credit overflow: {reason}")]
    CreditOverflow { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SX_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("SX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("SX_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, stdio).
    #[error("SX_ERR_903: I/O error: {0}")]
    Io(String),
}

impl ExchangeError {
    /// Shorthand for [`ExchangeError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`ExchangeError::InvalidState`].
    pub fn invalid_state(
        entity: &'static str,
        expected: impl Into<String>,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidState {
            entity,
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }

    /// Shorthand for [`ExchangeError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// The failure category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSession
            | Self::Forbidden { .. }
            | Self::AdminRequired
            | Self::WrongParty { .. } => ErrorKind::Authorization,
            Self::InvalidState { .. }
            | Self::AlreadyProcessed { .. }
            | Self::NegotiationPending
            | Self::AlreadyConfirmed { .. }
            | Self::DisputeAlreadyOpen
            | Self::AlreadyRated => ErrorKind::Precondition,
            Self::InsufficientCredits { .. }
            | Self::InvalidTerms { .. }
            | Self::Validation { .. }
            | Self::AccountSuspended { .. }
            | Self::AccountInactive
            | Self::AdminNotAllowed { .. } => ErrorKind::BusinessRule,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Irreversible { .. } | Self::AlreadyUndone => ErrorKind::Irrecoverable,
            Self::EscrowNotFound(_)
            | Self::EscrowNotHeld { .. }
            | Self::BalanceUnderflow { .. }
            | Self::LedgerInconsistency { .. }
            | Self::ConservationViolation { .. }
            | Self::CreditOverflow { .. } => ErrorKind::Integrity,
            Self::Internal(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ExchangeError>;

impl From<std::io::Error> for ExchangeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
