use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{ParticipantRecord, RankedParticipant};
use crate::recommendation::RecommendationCategory;

const STANDOUT_THRESHOLD: f64 = 80.0;
const CONCERN_THRESHOLD: f64 = 40.0;
const MAX_HIGHLIGHTED_TRAITS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMetric {
    RawScore,
    #[default]
    ScaledScore,
    Percentile,
    CompletionRate,
    TimeEfficiency,
}

impl ComparisonMetric {
    /// Unknown names fall back to the scaled score instead of failing.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "raw_score" => Self::RawScore,
            "scaled_score" => Self::ScaledScore,
            "percentile" => Self::Percentile,
            "completion_rate" => Self::CompletionRate,
            "time_efficiency" => Self::TimeEfficiency,
            _ => Self::default(),
        }
    }

    pub fn value_for(self, participant: &ParticipantRecord) -> f64 {
        match self {
            Self::RawScore => participant.overall_raw_score.unwrap_or(0.0),
            Self::ScaledScore => participant.score(),
            Self::Percentile => participant.percentile(),
            Self::CompletionRate => participant.completion_rate(),
            Self::TimeEfficiency => time_efficiency(
                participant.expected_time_seconds,
                participant.total_time_seconds,
            ),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::RawScore => "raw score",
            Self::ScaledScore => "scaled score",
            Self::Percentile => "percentile",
            Self::CompletionRate => "completion rate",
            Self::TimeEfficiency => "time efficiency",
        }
    }
}

impl<'de> Deserialize<'de> for ComparisonMetric {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Self::parse_lenient(value.as_deref()))
    }
}

/// Expected time over actual time as a percentage, clamped to [0, 100].
/// No recorded time counts as fully efficient.
pub fn time_efficiency(expected_seconds: f64, actual_seconds: f64) -> f64 {
    if actual_seconds <= 0.0 {
        return 100.0;
    }
    (expected_seconds / actual_seconds * 100.0).clamp(0.0, 100.0)
}

pub fn standout_traits(participant: &ParticipantRecord) -> Vec<String> {
    participant
        .traits
        .iter()
        .filter(|t| t.score >= STANDOUT_THRESHOLD)
        .take(MAX_HIGHLIGHTED_TRAITS)
        .map(|t| t.name.clone())
        .collect()
}

pub fn concern_areas(participant: &ParticipantRecord) -> Vec<String> {
    participant
        .traits
        .iter()
        .filter(|t| t.score <= CONCERN_THRESHOLD)
        .take(MAX_HIGHLIGHTED_TRAITS)
        .map(|t| t.name.clone())
        .collect()
}

/// Stable descending sort on the chosen metric. Ties keep their input order
/// and still receive consecutive ranks.
pub fn rank_participants(
    participants: &[ParticipantRecord],
    metric: ComparisonMetric,
) -> Vec<RankedParticipant> {
    let mut scored: Vec<(f64, &ParticipantRecord)> = participants
        .iter()
        .map(|p| (metric.value_for(p), p))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (metric_value, participant))| RankedParticipant {
            rank: index + 1,
            metric_value,
            completion_rate: participant.completion_rate(),
            standout_traits: standout_traits(participant),
            concern_areas: concern_areas(participant),
            recommendation_category: RecommendationCategory::NotRecommended,
            participant: participant.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TraitScore;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn participant(name: &str, score: f64) -> ParticipantRecord {
        ParticipantRecord {
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            overall_score: Some(score),
            overall_raw_score: None,
            overall_percentile: None,
            completed_attempts: 2,
            total_attempts: 2,
            total_time_seconds: 0.0,
            expected_time_seconds: 0.0,
            traits: Vec::new(),
            test_scores: Vec::new(),
        }
    }

    fn trait_score(name: &str, score: f64) -> TraitScore {
        TraitScore {
            name: name.to_string(),
            category: "General".to_string(),
            score,
        }
    }

    #[test]
    fn ranks_descending_by_scaled_score() {
        let ranked = rank_participants(
            &[participant("Avery", 61.0), participant("Jules", 88.0), participant("Kiara", 74.0)],
            ComparisonMetric::ScaledScore,
        );
        let names: Vec<&str> = ranked.iter().map(|r| r.participant.name.as_str()).collect();
        assert_eq!(names, vec!["Jules", "Kiara", "Avery"]);
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn ties_keep_input_order_with_consecutive_ranks() {
        let ranked = rank_participants(
            &[participant("First", 70.0), participant("Top", 90.0), participant("Second", 70.0)],
            ComparisonMetric::ScaledScore,
        );
        assert_eq!(ranked[1].participant.name, "First");
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].participant.name, "Second");
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn missing_score_ranks_as_zero() {
        let mut missing = participant("Missing", 0.0);
        missing.overall_score = None;
        let ranked = rank_participants(
            &[missing, participant("Present", 1.0)],
            ComparisonMetric::ScaledScore,
        );
        assert_eq!(ranked[0].participant.name, "Present");
        assert_eq!(ranked[1].metric_value, 0.0);
    }

    #[test]
    fn completion_rate_guards_zero_attempts() {
        let mut p = participant("Avery", 50.0);
        p.completed_attempts = 0;
        p.total_attempts = 0;
        assert_eq!(ComparisonMetric::CompletionRate.value_for(&p), 0.0);

        p.completed_attempts = 3;
        p.total_attempts = 4;
        assert_eq!(ComparisonMetric::CompletionRate.value_for(&p), 75.0);
    }

    #[test]
    fn time_efficiency_is_clamped_and_guarded() {
        assert_eq!(time_efficiency(1800.0, 0.0), 100.0);
        assert_eq!(time_efficiency(1800.0, 900.0), 100.0);
        assert_eq!(time_efficiency(1800.0, 3600.0), 50.0);
        assert_eq!(time_efficiency(0.0, 3600.0), 0.0);
    }

    #[test]
    fn ranks_by_raw_score_with_missing_as_zero() {
        let mut low = participant("Low", 95.0);
        low.overall_raw_score = Some(12.0);
        let mut missing = participant("Missing", 99.0);
        missing.overall_raw_score = None;
        let mut high = participant("High", 40.0);
        high.overall_raw_score = Some(31.0);

        let ranked = rank_participants(&[low, missing, high], ComparisonMetric::RawScore);
        let names: Vec<&str> = ranked.iter().map(|r| r.participant.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Low", "Missing"]);
        assert_eq!(ranked[0].metric_value, 31.0);
        assert_eq!(ranked[2].metric_value, 0.0);
    }

    #[test]
    fn ranks_by_time_efficiency() {
        let mut slow = participant("Slow", 90.0);
        slow.expected_time_seconds = 1800.0;
        slow.total_time_seconds = 3600.0;
        let mut untimed = participant("Untimed", 10.0);
        untimed.expected_time_seconds = 1800.0;
        untimed.total_time_seconds = 0.0;
        let mut steady = participant("Steady", 50.0);
        steady.expected_time_seconds = 1800.0;
        steady.total_time_seconds = 2400.0;

        let ranked = rank_participants(&[slow, untimed, steady], ComparisonMetric::TimeEfficiency);
        let names: Vec<&str> = ranked.iter().map(|r| r.participant.name.as_str()).collect();
        assert_eq!(names, vec!["Untimed", "Steady", "Slow"]);
        assert_eq!(ranked[0].metric_value, 100.0);
        assert_eq!(ranked[1].metric_value, 75.0);
        assert_eq!(ranked[2].metric_value, 50.0);
    }

    #[test]
    fn unknown_metric_names_default_to_scaled_score() {
        assert_eq!(ComparisonMetric::parse_lenient(None), ComparisonMetric::ScaledScore);
        assert_eq!(
            ComparisonMetric::parse_lenient(Some("speed")),
            ComparisonMetric::ScaledScore
        );
        assert_eq!(
            ComparisonMetric::parse_lenient(Some("time-efficiency")),
            ComparisonMetric::TimeEfficiency
        );
        let parsed: ComparisonMetric = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(parsed, ComparisonMetric::ScaledScore);
    }

    #[test]
    fn highlights_at_most_three_traits_each_way() {
        let mut p = participant("Avery", 80.0);
        p.traits = vec![
            trait_score("Leadership", 92.0),
            trait_score("Focus", 40.0),
            trait_score("Empathy", 80.0),
            trait_score("Planning", 85.0),
            trait_score("Grit", 99.0),
            trait_score("Patience", 12.0),
            trait_score("Stability", 55.0),
        ];
        assert_eq!(standout_traits(&p), vec!["Leadership", "Empathy", "Planning"]);
        assert_eq!(concern_areas(&p), vec!["Focus", "Patience"]);
    }

    proptest! {
        #[test]
        fn prop_ranking_is_stable(scores in prop::collection::vec(0u8..5, 2..30)) {
            let participants: Vec<ParticipantRecord> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| participant(&format!("P{i}"), *s as f64 * 10.0))
                .collect();
            let ranked = rank_participants(&participants, ComparisonMetric::ScaledScore);
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].metric_value >= pair[1].metric_value);
                if pair[0].metric_value == pair[1].metric_value {
                    let a = participants.iter().position(|p| p.user_id == pair[0].participant.user_id);
                    let b = participants.iter().position(|p| p.user_id == pair[1].participant.user_id);
                    prop_assert!(a < b);
                }
                prop_assert_eq!(pair[1].rank, pair[0].rank + 1);
            }
        }
    }
}
