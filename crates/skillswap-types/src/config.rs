//! Configuration types for the exchange engine.
//!
//! Every section deserializes with defaults for missing fields, so a config
//! file only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::{constants, Credits, SkillLevel};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub accounts: AccountConfig,
    pub matching: MatchingConfig,
    pub fraud: FraudConfig,
    pub sessions: SessionConfig,
}

/// Account provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Opening balance for non-admin users.
    pub initial_credits: Credits,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_credits: constants::DEFAULT_INITIAL_CREDITS,
        }
    }
}

/// Candidate scoring and the rematching cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub interval_secs: u64,
    pub beginner_score: u32,
    pub intermediate_score: u32,
    pub expert_score: u32,
    pub endorsement_weight: u32,
    pub endorsement_cap: u32,
}

impl MatchingConfig {
    /// Base score for a proficiency level.
    #[must_use]
    pub fn base_score(&self, level: SkillLevel) -> u32 {
        match level {
            SkillLevel::Beginner => self.beginner_score,
            SkillLevel::Intermediate => self.intermediate_score,
            SkillLevel::Expert => self.expert_score,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            interval_secs: constants::DEFAULT_MATCHING_INTERVAL_SECS,
            beginner_score: constants::BASE_SCORE_BEGINNER,
            intermediate_score: constants::BASE_SCORE_INTERMEDIATE,
            expert_score: constants::BASE_SCORE_EXPERT,
            endorsement_weight: constants::ENDORSEMENT_WEIGHT,
            endorsement_cap: constants::ENDORSEMENT_BONUS_CAP,
        }
    }
}

/// Fraud scan cadence, window, and rule thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FraudConfig {
    pub interval_secs: u64,
    pub window_hours: i64,
    pub suppression_hours: i64,
    pub volume_count: usize,
    pub volume_high_count: usize,
    pub repeat_count: usize,
    pub repeat_high_count: usize,
    pub pattern_min_count: usize,
    pub pattern_max_partners: usize,
    pub pattern_min_volume: Credits,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            interval_secs: constants::DEFAULT_FRAUD_INTERVAL_SECS,
            window_hours: constants::DEFAULT_FRAUD_WINDOW_HOURS,
            suppression_hours: constants::DEFAULT_FRAUD_SUPPRESSION_HOURS,
            volume_count: constants::UNUSUAL_VOLUME_COUNT,
            volume_high_count: constants::UNUSUAL_VOLUME_HIGH_COUNT,
            repeat_count: constants::REPEATED_TRANSFER_COUNT,
            repeat_high_count: constants::REPEATED_TRANSFER_HIGH_COUNT,
            pattern_min_count: constants::PATTERN_MIN_COUNT,
            pattern_max_partners: constants::PATTERN_MAX_PARTNERS,
            pattern_min_volume: constants::PATTERN_MIN_VOLUME,
        }
    }
}

/// Session token lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: constants::DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_defaults() {
        let cfg = MatchingConfig::default();
        assert_eq!(cfg.interval_secs, 900);
        assert_eq!(cfg.base_score(SkillLevel::Beginner), 50);
        assert_eq!(cfg.base_score(SkillLevel::Intermediate), 70);
        assert_eq!(cfg.base_score(SkillLevel::Expert), 90);
    }

    #[test]
    fn fraud_defaults() {
        let cfg = FraudConfig::default();
        assert_eq!(cfg.interval_secs, 3600);
        assert_eq!(cfg.window_hours, 24);
        assert_eq!(cfg.volume_count, 10);
        assert_eq!(cfg.pattern_min_volume, 100);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: ExchangeConfig =
            serde_json::from_str(r#"{"accounts":{"initial_credits":250}}"#).unwrap();
        assert_eq!(cfg.accounts.initial_credits, 250);
        assert_eq!(cfg.matching, MatchingConfig::default());
        assert_eq!(cfg.sessions.ttl_hours, 24);
    }
}
