//! System-wide constants for the SkillSwap exchange engine.

use crate::Credits;

/// Opening balance granted to a newly registered user.
pub const DEFAULT_INITIAL_CREDITS: Credits = 100;

// --- Matching ---

/// Base score for a beginner-level provider.
pub const BASE_SCORE_BEGINNER: u32 = 50;

/// Base score for an intermediate-level provider.
pub const BASE_SCORE_INTERMEDIATE: u32 = 70;

/// Base score for an expert-level provider.
pub const BASE_SCORE_EXPERT: u32 = 90;

/// Score bonus per endorsement.
pub const ENDORSEMENT_WEIGHT: u32 = 2;

/// Cap on the total endorsement bonus.
pub const ENDORSEMENT_BONUS_CAP: u32 = 10;

/// Cadence of the scheduled rematching job (15 minutes).
pub const DEFAULT_MATCHING_INTERVAL_SECS: u64 = 900;

// --- Fraud heuristics ---

/// Cadence of the scheduled fraud scan (1 hour).
pub const DEFAULT_FRAUD_INTERVAL_SECS: u64 = 3600;

/// Look-back window of the fraud scan.
pub const DEFAULT_FRAUD_WINDOW_HOURS: i64 = 24;

/// A user with an open alert younger than this is skipped.
pub const DEFAULT_FRAUD_SUPPRESSION_HOURS: i64 = 24;

/// Rule 1 fires above this many transactions in the window.
pub const UNUSUAL_VOLUME_COUNT: usize = 10;

/// Rule 1 escalates to high severity above this count.
pub const UNUSUAL_VOLUME_HIGH_COUNT: usize = 20;

/// Rule 2 fires above this many transactions with one partner.
pub const REPEATED_TRANSFER_COUNT: usize = 3;

/// Rule 2 escalates to high severity above this count.
pub const REPEATED_TRANSFER_HIGH_COUNT: usize = 5;

/// Rule 3 needs at least this many transactions...
pub const PATTERN_MIN_COUNT: usize = 5;

/// ...with at most this many distinct partners...
pub const PATTERN_MAX_PARTNERS: usize = 2;

/// ...moving more than this many credits.
pub const PATTERN_MIN_VOLUME: Credits = 100;

// --- Sessions ---

/// Lifetime of an issued session token.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Raw session token length in bytes (hex-encoded on the wire).
pub const SESSION_TOKEN_BYTES: usize = 32;

// --- Ratings ---

pub const MIN_RATING_SCORE: u8 = 1;
pub const MAX_RATING_SCORE: u8 = 5;

/// Placeholder for a dangling user reference in read paths.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "SkillSwap";
