//! # skillswap-types
//!
//! Shared types, errors, and configuration for the **SkillSwap** exchange
//! engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`RequestId`], [`MatchId`], [`NegotiationId`], [`TransactionId`], [`AdminActionId`], ...
//! - **Participants**: [`User`], [`Role`], [`UserProfile`]
//! - **Requests**: [`ServiceRequest`], [`SkillRecord`], [`Terms`], [`ExchangeMode`]
//! - **Negotiation**: [`SuggestedMatch`], [`Negotiation`], [`PartyRole`]
//! - **Transactions**: [`Transaction`], [`TransactionStatus`]
//! - **Ledger rows**: [`CreditHistoryEntry`], [`EntryKind`]
//! - **Moderation**: [`Rating`], [`Report`], [`ReportTarget`], [`Dispute`], [`FraudAlert`]
//! - **Admin journal**: [`AdminAction`], [`AdminActionType`], [`NewAdminAction`]
//! - **Notifications**: [`Notification`], [`NotificationKind`]
//! - **Configuration**: [`ExchangeConfig`] and its sections
//! - **Errors**: [`ExchangeError`] with `SX_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod admin;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod moderation;
pub mod negotiation;
pub mod notification;
pub mod request;
pub mod transaction;
pub mod user;

/// Whole credits. Balances are never negative.
pub type Credits = i64;

// Re-export all primary types at crate root for ergonomic imports:
//   use skillswap_types::{Transaction, TransactionStatus, Terms, ...};

pub use admin::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use ledger::*;
pub use moderation::*;
pub use negotiation::*;
pub use notification::*;
pub use request::*;
pub use transaction::*;
pub use user::*;

// Constants are accessed via `skillswap_types::constants::FOO`
// (not re-exported to avoid name collisions).
