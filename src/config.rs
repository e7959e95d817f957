use serde::Deserialize;

use crate::ranking::ComparisonMetric;

pub const DEFAULT_TOP_PERFORMERS: usize = 10;
pub const DEFAULT_LANGUAGE: &str = "en";

/// Options controlling which sections of a comparative report are built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub comparison_metric: ComparisonMetric,
    pub top_performers_count: usize,
    pub include_cluster_analysis: bool,
    pub include_rankings: bool,
    pub include_distribution_analysis: bool,
    pub language: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            comparison_metric: ComparisonMetric::default(),
            top_performers_count: DEFAULT_TOP_PERFORMERS,
            include_cluster_analysis: false,
            include_rankings: true,
            include_distribution_analysis: true,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}
