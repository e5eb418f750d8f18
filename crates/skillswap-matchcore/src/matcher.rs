//! Pure deterministic candidate selection.
//!
//! ```text
//! suggest_providers(request, skills, already_matched) -> Vec<Candidate>
//! ```
//!
//! No store access, no notifications. The caller decides which skill
//! records are eligible (active, non-admin owners) and persists the result.
//!
//! ## Duplicate Guarantee
//!
//! A provider listed in `already_matched` is never returned, and a provider
//! with several records for the same skill is returned once, with their best
//! score. Feeding the output back in as `already_matched` therefore always
//! yields an empty result.

use std::collections::{BTreeMap, HashSet};

use skillswap_types::{MatchingConfig, ServiceRequest, SkillId, SkillRecord, UserId, normalize_skill};

use crate::scoring::score_skill;

/// A provider the matcher proposes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub provider_id: UserId,
    pub skill_id: SkillId,
    pub score: u32,
}

/// Score every new provider whose skill matches the request's need.
///
/// ## Algorithm
///
/// 1. Keep records whose normalized name equals the request's skill
/// 2. Drop the requester and any provider in `already_matched`
/// 3. Collapse to the best-scoring record per provider
/// 4. Order by score descending, then provider id (creation order)
#[must_use]
pub fn suggest_providers<'a, I>(
    request: &ServiceRequest,
    skills: I,
    already_matched: &HashSet<UserId>,
    config: &MatchingConfig,
) -> Vec<Candidate>
where
    I: IntoIterator<Item = &'a SkillRecord>,
{
    let needed = normalize_skill(&request.skill_needed);
    let mut best: BTreeMap<UserId, Candidate> = BTreeMap::new();

    for skill in skills {
        if normalize_skill(&skill.name) != needed
            || skill.user_id == request.requester_id
            || already_matched.contains(&skill.user_id)
        {
            continue;
        }
        let candidate = Candidate {
            provider_id: skill.user_id,
            skill_id: skill.id,
            score: score_skill(skill, config),
        };
        best.entry(skill.user_id)
            .and_modify(|current| {
                if candidate.score > current.score {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut out: Vec<Candidate> = best.into_values().collect();
    out.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.provider_id.cmp(&b.provider_id))
    });
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use skillswap_types::{RequestId, RequestStatus, SkillLevel, Terms};

    use super::*;

    fn request(requester: UserId, skill: &str) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: RequestId::new(),
            requester_id: requester,
            title: "Need help".into(),
            description: String::new(),
            skill_needed: normalize_skill(skill),
            terms: Terms::Credit { amount: 30 },
            status: RequestStatus::Open,
            matched_provider_id: None,
            is_reported: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn matches_by_normalized_skill_name() {
        let requester = UserId::new();
        let provider = UserId::new();
        let skills = vec![
            SkillRecord::new(provider, "Graphic Design", SkillLevel::Expert, 2),
            SkillRecord::new(UserId::new(), "plumbing", SkillLevel::Expert, 9),
        ];
        let out = suggest_providers(
            &request(requester, "  graphic DESIGN"),
            &skills,
            &HashSet::new(),
            &MatchingConfig::default(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].provider_id, provider);
        assert_eq!(out[0].score, 94);
    }

    #[test]
    fn requester_is_never_their_own_provider() {
        let requester = UserId::new();
        let skills = vec![SkillRecord::new(requester, "piano", SkillLevel::Expert, 0)];
        let out = suggest_providers(
            &request(requester, "piano"),
            &skills,
            &HashSet::new(),
            &MatchingConfig::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn already_matched_providers_are_skipped() {
        let requester = UserId::new();
        let p1 = UserId::new();
        let p2 = UserId::new();
        let skills = vec![
            SkillRecord::new(p1, "piano", SkillLevel::Beginner, 0),
            SkillRecord::new(p2, "piano", SkillLevel::Expert, 0),
        ];
        let req = request(requester, "piano");
        let cfg = MatchingConfig::default();

        let first = suggest_providers(&req, &skills, &HashSet::new(), &cfg);
        assert_eq!(first.len(), 2);

        let matched: HashSet<UserId> = first.iter().map(|c| c.provider_id).collect();
        let second = suggest_providers(&req, &skills, &matched, &cfg);
        assert!(second.is_empty());
    }

    #[test]
    fn duplicate_records_collapse_to_best_score() {
        let requester = UserId::new();
        let provider = UserId::new();
        let skills = vec![
            SkillRecord::new(provider, "piano", SkillLevel::Beginner, 0),
            SkillRecord::new(provider, "Piano", SkillLevel::Intermediate, 1),
        ];
        let out = suggest_providers(
            &request(requester, "piano"),
            &skills,
            &HashSet::new(),
            &MatchingConfig::default(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 72);
    }

    #[test]
    fn ordered_by_score_descending() {
        let requester = UserId::new();
        let skills = vec![
            SkillRecord::new(UserId::new(), "piano", SkillLevel::Beginner, 0),
            SkillRecord::new(UserId::new(), "piano", SkillLevel::Expert, 0),
            SkillRecord::new(UserId::new(), "piano", SkillLevel::Intermediate, 0),
        ];
        let out = suggest_providers(
            &request(requester, "piano"),
            &skills,
            &HashSet::new(),
            &MatchingConfig::default(),
        );
        let scores: Vec<u32> = out.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![90, 70, 50]);
    }
}
