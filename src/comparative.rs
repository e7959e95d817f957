use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use crate::cluster;
use crate::config::QueryConfig;
use crate::error::AnalyticsError;
use crate::models::{
    ComparativeReportData, HiringRecommendations, HistogramBucket, ParticipantRecord,
    RankedParticipant, RecommendedCandidate, ReportSessionContext, ScoreRange, SessionBatch,
    StatisticalAnalysis, TestComparison, TestPerformer,
};
use crate::ranking;
use crate::recommendation::{self, RecommendationCategory};
use crate::stats::{self, ScoreSample};
use crate::traits::{self, ParticipantIndex};

pub const MIN_PARTICIPANTS: usize = 2;
const PERFORMERS_PER_TEST: usize = 3;

/// Upper bounds (inclusive) of the per-test score histogram.
const HISTOGRAM_BUCKETS: [(&str, f64); 5] = [
    ("0-20", 20.0),
    ("21-40", 40.0),
    ("41-60", 60.0),
    ("61-80", 80.0),
    ("81-100", f64::INFINITY),
];

pub fn qualifying_participants(participants: &[ParticipantRecord]) -> Vec<ParticipantRecord> {
    participants
        .iter()
        .filter(|p| p.total_attempts > 0 && p.completed_attempts > 0)
        .cloned()
        .collect()
}

/// Builds the full comparative report for one session.
pub fn build_comparative_report(
    batch: &SessionBatch,
    config: &QueryConfig,
) -> Result<ComparativeReportData, AnalyticsError> {
    let participants = qualifying_participants(&batch.participants);
    if participants.len() < MIN_PARTICIPANTS {
        return Err(AnalyticsError::InsufficientData {
            found: participants.len(),
        });
    }

    info!(
        session = %batch.session.code,
        participants = participants.len(),
        metric = config.comparison_metric.label(),
        "building comparative report"
    );

    let samples: Vec<ScoreSample> = participants
        .iter()
        .map(|p| ScoreSample {
            participant_id: p.user_id,
            score: p.score(),
        })
        .collect();
    let summary = stats::summarize(&samples)?;
    debug!(
        mean = summary.mean,
        median = summary.median,
        outliers = summary.outliers.len(),
        "score series summarized"
    );

    let mut rankings = ranking::rank_participants(&participants, config.comparison_metric);
    for ranked in rankings.iter_mut() {
        ranked.recommendation_category = recommendation::categorize(
            ranked.participant.score(),
            ranked.completion_rate,
            ranked.participant.percentile(),
        );
    }

    let trait_distribution = if config.include_distribution_analysis {
        let index = ParticipantIndex::from_participants(&participants);
        traits::analyze_distribution(&traits::flatten_traits(&participants), &index)
    } else {
        Vec::new()
    };

    let cluster_analysis = if config.include_cluster_analysis {
        cluster::analyze_clusters(&rankings)
    } else {
        None
    };

    let test_comparisons = compare_tests(&participants);
    let hiring_recommendations = group_recommendations(&rankings);
    let top_performers: Vec<RankedParticipant> = rankings
        .iter()
        .take(config.top_performers_count)
        .cloned()
        .collect();

    debug!(
        traits = trait_distribution.len(),
        tests = test_comparisons.len(),
        clustered = cluster_analysis.is_some(),
        "report sections assembled"
    );

    Ok(ComparativeReportData {
        session_context: ReportSessionContext {
            session: batch.session.clone(),
            total_participants: batch.participants.len(),
            analyzed_participants: participants.len(),
            comparison_metric: config.comparison_metric,
            language: config.language.clone(),
        },
        participant_rankings: if config.include_rankings {
            rankings
        } else {
            Vec::new()
        },
        top_performers,
        statistical_analysis: StatisticalAnalysis {
            mean: summary.mean,
            median: summary.median,
            standard_deviation: summary.standard_deviation,
            score_range: ScoreRange {
                min: summary.min,
                max: summary.max,
            },
            quartiles: summary.quartiles,
            outliers: summary.outliers,
        },
        test_comparisons,
        trait_distribution,
        cluster_analysis,
        hiring_recommendations,
    })
}

/// Per-test comparisons in the order tests are first seen across participants.
pub fn compare_tests(participants: &[ParticipantRecord]) -> Vec<TestComparison> {
    let mut positions: HashMap<Uuid, usize> = HashMap::new();
    let mut tests: Vec<(Uuid, String, Vec<TestPerformer>)> = Vec::new();

    for participant in participants {
        for test in &participant.test_scores {
            let position = *positions.entry(test.test_id).or_insert_with(|| {
                tests.push((test.test_id, test.test_name.clone(), Vec::new()));
                tests.len() - 1
            });
            tests[position].2.push(TestPerformer {
                participant_id: participant.user_id,
                name: participant.name.clone(),
                score: test.score,
            });
        }
    }

    tests
        .into_iter()
        .map(|(test_id, test_name, performers)| {
            let scores: Vec<f64> = performers.iter().map(|p| p.score).collect();

            let mut descending = performers.clone();
            descending.sort_by(|a, b| b.score.total_cmp(&a.score));
            let mut ascending = performers;
            ascending.sort_by(|a, b| a.score.total_cmp(&b.score));

            TestComparison {
                test_id,
                test_name,
                participant_count: scores.len(),
                average_score: stats::mean(&scores),
                top_performers: descending.into_iter().take(PERFORMERS_PER_TEST).collect(),
                bottom_performers: ascending.into_iter().take(PERFORMERS_PER_TEST).collect(),
                score_distribution: score_histogram(&scores),
            }
        })
        .collect()
}

pub fn score_histogram(scores: &[f64]) -> Vec<HistogramBucket> {
    let mut counts = [0usize; HISTOGRAM_BUCKETS.len()];
    for &score in scores {
        let bucket = HISTOGRAM_BUCKETS
            .iter()
            .position(|(_, upper)| score <= *upper)
            .unwrap_or(HISTOGRAM_BUCKETS.len() - 1);
        counts[bucket] += 1;
    }

    HISTOGRAM_BUCKETS
        .iter()
        .zip(counts)
        .map(|((range, _), count)| HistogramBucket {
            range: range.to_string(),
            count,
        })
        .collect()
}

fn group_recommendations(rankings: &[RankedParticipant]) -> HiringRecommendations {
    let mut grouped = HiringRecommendations {
        decision_criteria: recommendation::decision_criteria(),
        ..Default::default()
    };

    for ranked in rankings {
        let candidate = RecommendedCandidate {
            participant_id: ranked.participant.user_id,
            name: ranked.participant.name.clone(),
            rank: ranked.rank,
            overall_score: ranked.participant.score(),
            completion_rate: ranked.completion_rate,
            position_fit: ranked.participant.percentile(),
        };
        match ranked.recommendation_category {
            RecommendationCategory::HighlyRecommended => grouped.highly_recommended.push(candidate),
            RecommendationCategory::Recommended => grouped.recommended.push(candidate),
            RecommendationCategory::Conditional => grouped.conditional.push(candidate),
            RecommendationCategory::NotRecommended => grouped.not_recommended.push(candidate),
        }
    }

    grouped
}
