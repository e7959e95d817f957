use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{
    ParticipantRecord, StrengthDistribution, TopScorer, TraitDistribution, TraitScore,
};
use crate::stats;

pub const MAX_TRAIT_GROUPS: usize = 15;
const MAX_TOP_SCORERS: usize = 3;
const UNKNOWN_PARTICIPANT: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLevel {
    VeryLow,
    Low,
    Average,
    High,
    VeryHigh,
}

impl StrengthLevel {
    /// Boundary values belong to the higher bucket.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::VeryHigh
        } else if score >= 60.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Average
        } else if score >= 20.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl StrengthDistribution {
    fn record(&mut self, level: StrengthLevel) {
        match level {
            StrengthLevel::VeryLow => self.very_low += 1,
            StrengthLevel::Low => self.low += 1,
            StrengthLevel::Average => self.average += 1,
            StrengthLevel::High => self.high += 1,
            StrengthLevel::VeryHigh => self.very_high += 1,
        }
    }
}

/// Read-only lookup from participant id to display name.
#[derive(Debug, Clone, Default)]
pub struct ParticipantIndex {
    names: HashMap<Uuid, String>,
}

impl ParticipantIndex {
    pub fn from_participants(participants: &[ParticipantRecord]) -> Self {
        Self {
            names: participants
                .iter()
                .map(|p| (p.user_id, p.name.clone()))
                .collect(),
        }
    }

    pub fn name_of(&self, user_id: &Uuid) -> &str {
        self.names
            .get(user_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_PARTICIPANT)
    }
}

/// A trait score together with the participant it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitEntry {
    pub user_id: Uuid,
    pub trait_score: TraitScore,
}

pub fn flatten_traits(participants: &[ParticipantRecord]) -> Vec<TraitEntry> {
    participants
        .iter()
        .flat_map(|p| {
            p.traits.iter().map(move |t| TraitEntry {
                user_id: p.user_id,
                trait_score: t.clone(),
            })
        })
        .collect()
}

/// Groups entries by trait name in first-seen order and keeps the first
/// `MAX_TRAIT_GROUPS` groups encountered.
pub fn analyze_distribution(
    entries: &[TraitEntry],
    index: &ParticipantIndex,
) -> Vec<TraitDistribution> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&TraitEntry>> = Vec::new();

    for entry in entries {
        let name = entry.trait_score.name.as_str();
        match positions.get(name) {
            Some(&position) => groups[position].push(entry),
            None => {
                positions.insert(name, groups.len());
                groups.push(vec![entry]);
            }
        }
    }

    groups
        .into_iter()
        .take(MAX_TRAIT_GROUPS)
        .map(|group| summarize_group(&group, index))
        .collect()
}

fn summarize_group(group: &[&TraitEntry], index: &ParticipantIndex) -> TraitDistribution {
    let scores: Vec<f64> = group.iter().map(|e| e.trait_score.score).collect();

    let mut distribution = StrengthDistribution::default();
    for score in &scores {
        distribution.record(StrengthLevel::from_score(*score));
    }

    let mut ordered: Vec<&TraitEntry> = group.to_vec();
    ordered.sort_by(|a, b| b.trait_score.score.total_cmp(&a.trait_score.score));
    let top_scorers = ordered
        .into_iter()
        .take(MAX_TOP_SCORERS)
        .map(|e| TopScorer {
            participant_id: e.user_id,
            name: index.name_of(&e.user_id).to_string(),
            score: e.trait_score.score,
        })
        .collect();

    let first = group[0];
    TraitDistribution {
        trait_name: first.trait_score.name.clone(),
        category: first.trait_score.category.clone(),
        participant_count: group.len(),
        average_score: stats::mean(&scores),
        variability: stats::population_std_dev(&scores),
        distribution,
        top_scorers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: Uuid, name: &str, score: f64) -> TraitEntry {
        TraitEntry {
            user_id,
            trait_score: TraitScore {
                name: name.to_string(),
                category: "Personality".to_string(),
                score,
            },
        }
    }

    #[test]
    fn bucket_boundaries_go_to_the_higher_level() {
        assert_eq!(StrengthLevel::from_score(19.99), StrengthLevel::VeryLow);
        assert_eq!(StrengthLevel::from_score(20.0), StrengthLevel::Low);
        assert_eq!(StrengthLevel::from_score(40.0), StrengthLevel::Average);
        assert_eq!(StrengthLevel::from_score(60.0), StrengthLevel::High);
        assert_eq!(StrengthLevel::from_score(79.99), StrengthLevel::High);
        assert_eq!(StrengthLevel::from_score(80.0), StrengthLevel::VeryHigh);
        assert_eq!(StrengthLevel::from_score(-5.0), StrengthLevel::VeryLow);
        assert_eq!(StrengthLevel::from_score(130.0), StrengthLevel::VeryHigh);
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let entries = vec![
            entry(a, "Teamwork", 70.0),
            entry(a, "Analytical", 40.0),
            entry(b, "Analytical", 60.0),
            entry(b, "Teamwork", 90.0),
        ];
        let index = ParticipantIndex::default();
        let result = analyze_distribution(&entries, &index);

        assert_eq!(result[0].trait_name, "Teamwork");
        assert_eq!(result[1].trait_name, "Analytical");
        assert_eq!(result[0].average_score, 80.0);
        assert_eq!(result[0].variability, 10.0);
        assert_eq!(result[1].participant_count, 2);
        assert_eq!(result[1].distribution.average, 1);
        assert_eq!(result[1].distribution.high, 1);
    }

    #[test]
    fn top_scorers_resolve_names_with_fallback() {
        let known = ParticipantRecord {
            user_id: Uuid::new_v4(),
            name: "Kiara Patel".to_string(),
            email: "kiara@example.com".to_string(),
            overall_score: Some(80.0),
            overall_raw_score: None,
            overall_percentile: None,
            completed_attempts: 1,
            total_attempts: 1,
            total_time_seconds: 0.0,
            expected_time_seconds: 0.0,
            traits: Vec::new(),
            test_scores: Vec::new(),
        };
        let stranger = Uuid::new_v4();
        let index = ParticipantIndex::from_participants(std::slice::from_ref(&known));
        let entries = vec![
            entry(stranger, "Resilience", 55.0),
            entry(known.user_id, "Resilience", 91.0),
            entry(Uuid::new_v4(), "Resilience", 10.0),
            entry(Uuid::new_v4(), "Resilience", 55.0),
        ];

        let result = analyze_distribution(&entries, &index);
        let top = &result[0].top_scorers;
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].name, "Kiara Patel");
        assert_eq!(top[1].participant_id, stranger);
        assert_eq!(top[1].name, "Unknown");
        assert_eq!(top[2].score, 55.0);
    }

    #[test]
    fn truncates_to_first_fifteen_groups() {
        let user = Uuid::new_v4();
        let entries: Vec<TraitEntry> = (0..20)
            .map(|i| entry(user, &format!("Trait {i}"), 100.0 - i as f64))
            .collect();
        let result = analyze_distribution(&entries, &ParticipantIndex::default());

        assert_eq!(result.len(), MAX_TRAIT_GROUPS);
        assert_eq!(result[0].trait_name, "Trait 0");
        assert_eq!(result[14].trait_name, "Trait 14");
    }

    #[test]
    fn flatten_keeps_owner() {
        let mut p = ParticipantRecord {
            user_id: Uuid::new_v4(),
            name: "Avery Lee".to_string(),
            email: "avery@example.com".to_string(),
            overall_score: None,
            overall_raw_score: None,
            overall_percentile: None,
            completed_attempts: 1,
            total_attempts: 1,
            total_time_seconds: 0.0,
            expected_time_seconds: 0.0,
            traits: Vec::new(),
            test_scores: Vec::new(),
        };
        p.traits.push(TraitScore {
            name: "Focus".to_string(),
            category: "General".to_string(),
            score: 64.0,
        });
        let flattened = flatten_traits(&[p.clone()]);
        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].user_id, p.user_id);
    }
}
