use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ranking::ComparisonMetric;
use crate::recommendation::RecommendationCategory;

pub const DEFAULT_TRAIT_CATEGORY: &str = "General";

fn default_trait_category() -> String {
    DEFAULT_TRAIT_CATEGORY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitScore {
    pub name: String,
    #[serde(default = "default_trait_category")]
    pub category: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestScore {
    pub test_id: Uuid,
    pub test_name: String,
    pub score: f64,
}

/// One participant's results within a session, already aggregated from
/// attempt rows by the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub overall_raw_score: Option<f64>,
    #[serde(default)]
    pub overall_percentile: Option<f64>,
    pub completed_attempts: u32,
    pub total_attempts: u32,
    #[serde(default)]
    pub total_time_seconds: f64,
    #[serde(default)]
    pub expected_time_seconds: f64,
    #[serde(default)]
    pub traits: Vec<TraitScore>,
    #[serde(default)]
    pub test_scores: Vec<TestScore>,
}

impl ParticipantRecord {
    pub fn score(&self) -> f64 {
        self.overall_score.unwrap_or(0.0)
    }

    pub fn percentile(&self) -> f64 {
        self.overall_percentile.unwrap_or(0.0)
    }

    pub fn completion_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.completed_attempts as f64 / self.total_attempts as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Everything the assembler needs for one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBatch {
    pub session: SessionContext,
    pub participants: Vec<ParticipantRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedParticipant {
    #[serde(flatten)]
    pub participant: ParticipantRecord,
    pub rank: usize,
    pub metric_value: f64,
    pub completion_rate: f64,
    pub standout_traits: Vec<String>,
    pub concern_areas: Vec<String>,
    pub recommendation_category: RecommendationCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierKind {
    HighOutlier,
    LowOutlier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlier {
    pub participant_id: Uuid,
    pub score: f64,
    pub kind: OutlierKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticalSummary {
    pub mean: f64,
    pub median: f64,
    pub standard_deviation: f64,
    pub min: f64,
    pub max: f64,
    pub quartiles: Quartiles,
    pub outliers: Vec<Outlier>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrengthDistribution {
    pub very_low: usize,
    pub low: usize,
    pub average: usize,
    pub high: usize,
    pub very_high: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopScorer {
    pub participant_id: Uuid,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitDistribution {
    pub trait_name: String,
    pub category: String,
    pub participant_count: usize,
    pub average_score: f64,
    pub variability: f64,
    pub distribution: StrengthDistribution,
    pub top_scorers: Vec<TopScorer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    HighPerformers,
    AveragePerformers,
    DevelopingPerformers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMember {
    pub participant_id: Uuid,
    pub name: String,
    pub score: f64,
    pub distance_from_center: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceCluster {
    pub tier: PerformanceTier,
    pub description: String,
    pub anchor_score: f64,
    pub participant_count: usize,
    pub average_score: f64,
    pub characteristics: Vec<String>,
    pub members: Vec<ClusterMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterResult {
    pub clusters: Vec<PerformanceCluster>,
    pub cluster_validity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticalAnalysis {
    pub mean: f64,
    pub median: f64,
    pub standard_deviation: f64,
    pub score_range: ScoreRange,
    pub quartiles: Quartiles,
    pub outliers: Vec<Outlier>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPerformer {
    pub participant_id: Uuid,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub range: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestComparison {
    pub test_id: Uuid,
    pub test_name: String,
    pub participant_count: usize,
    pub average_score: f64,
    pub top_performers: Vec<TestPerformer>,
    pub bottom_performers: Vec<TestPerformer>,
    pub score_distribution: Vec<HistogramBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedCandidate {
    pub participant_id: Uuid,
    pub name: String,
    pub rank: usize,
    pub overall_score: f64,
    pub completion_rate: f64,
    pub position_fit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HiringRecommendations {
    pub highly_recommended: Vec<RecommendedCandidate>,
    pub recommended: Vec<RecommendedCandidate>,
    pub conditional: Vec<RecommendedCandidate>,
    pub not_recommended: Vec<RecommendedCandidate>,
    pub decision_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSessionContext {
    #[serde(flatten)]
    pub session: SessionContext,
    pub total_participants: usize,
    pub analyzed_participants: usize,
    pub comparison_metric: ComparisonMetric,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparativeReportData {
    pub session_context: ReportSessionContext,
    pub participant_rankings: Vec<RankedParticipant>,
    pub top_performers: Vec<RankedParticipant>,
    pub statistical_analysis: StatisticalAnalysis,
    pub test_comparisons: Vec<TestComparison>,
    pub trait_distribution: Vec<TraitDistribution>,
    pub cluster_analysis: Option<ClusterResult>,
    pub hiring_recommendations: HiringRecommendations,
}
