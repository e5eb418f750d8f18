//! # skillswap-matchcore
//!
//! **Pure deterministic candidate scoring for SkillSwap.**
//!
//! MatchCore takes an open request and a pool of skill records and returns
//! the providers worth suggesting. It has:
//!
//! - **Zero side effects**: no store writes, no notifications
//! - **Deterministic output**: same input -> same candidates in the same order
//! - **Self-match prevention**: a requester is never their own provider
//! - **Duplicate suppression**: already-matched providers are never rescored

pub mod matcher;
pub mod scoring;

pub use matcher::{Candidate, suggest_providers};
pub use scoring::score_skill;
