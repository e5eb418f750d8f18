//! Provider scoring.
//!
//! ```text
//! score = base(level) + min(endorsements * weight, cap)
//! ```
//!
//! With the default configuration the base is 50 / 70 / 90 for beginner /
//! intermediate / expert, the weight is 2, and the cap is 10.

use skillswap_types::{MatchingConfig, SkillRecord};

/// Score a single skill record.
#[must_use]
pub fn score_skill(skill: &SkillRecord, config: &MatchingConfig) -> u32 {
    let bonus = skill
        .endorsements
        .saturating_mul(config.endorsement_weight)
        .min(config.endorsement_cap);
    config.base_score(skill.level).saturating_add(bonus)
}

#[cfg(test)]
mod tests {
    use skillswap_types::{SkillLevel, UserId};

    use super::*;

    fn skill(level: SkillLevel, endorsements: u32) -> SkillRecord {
        SkillRecord::new(UserId::new(), "design", level, endorsements)
    }

    #[test]
    fn base_scores_by_level() {
        let cfg = MatchingConfig::default();
        assert_eq!(score_skill(&skill(SkillLevel::Beginner, 0), &cfg), 50);
        assert_eq!(score_skill(&skill(SkillLevel::Intermediate, 0), &cfg), 70);
        assert_eq!(score_skill(&skill(SkillLevel::Expert, 0), &cfg), 90);
    }

    #[test]
    fn expert_with_two_endorsements_scores_94() {
        let cfg = MatchingConfig::default();
        assert_eq!(score_skill(&skill(SkillLevel::Expert, 2), &cfg), 94);
    }

    #[test]
    fn endorsement_bonus_is_capped() {
        let cfg = MatchingConfig::default();
        assert_eq!(score_skill(&skill(SkillLevel::Beginner, 5), &cfg), 60);
        assert_eq!(score_skill(&skill(SkillLevel::Beginner, 500), &cfg), 60);
        assert_eq!(score_skill(&skill(SkillLevel::Beginner, u32::MAX), &cfg), 60);
    }
}
