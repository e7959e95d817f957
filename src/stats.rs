use uuid::Uuid;

use crate::error::AnalyticsError;
use crate::models::{Outlier, OutlierKind, Quartiles, StatisticalSummary};

const IQR_FENCE: f64 = 1.5;

/// A single participant's score in the series under analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSample {
    pub participant_id: Uuid,
    pub score: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted_ascending(values);
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Quartiles by index selection: `sorted[floor(n * p)]`, no interpolation.
pub fn quartiles(values: &[f64]) -> Quartiles {
    if values.is_empty() {
        return Quartiles {
            q1: 0.0,
            q2: 0.0,
            q3: 0.0,
        };
    }
    let sorted = sorted_ascending(values);
    let n = sorted.len();
    let pick = |fraction: f64| sorted[((n as f64 * fraction).floor() as usize).min(n - 1)];
    Quartiles {
        q1: pick(0.25),
        q2: pick(0.5),
        q3: pick(0.75),
    }
}

/// Flags samples strictly outside `[q1 - 1.5 * iqr, q3 + 1.5 * iqr]`,
/// keeping the order of the input series.
pub fn detect_outliers(samples: &[ScoreSample], quartiles: &Quartiles) -> Vec<Outlier> {
    let iqr = quartiles.q3 - quartiles.q1;
    let lower_bound = quartiles.q1 - IQR_FENCE * iqr;
    let upper_bound = quartiles.q3 + IQR_FENCE * iqr;

    samples
        .iter()
        .filter_map(|sample| {
            let kind = if sample.score < lower_bound {
                OutlierKind::LowOutlier
            } else if sample.score > upper_bound {
                OutlierKind::HighOutlier
            } else {
                return None;
            };
            Some(Outlier {
                participant_id: sample.participant_id,
                score: sample.score,
                kind,
            })
        })
        .collect()
}

pub fn summarize(samples: &[ScoreSample]) -> Result<StatisticalSummary, AnalyticsError> {
    if samples.is_empty() {
        return Err(AnalyticsError::NoData);
    }

    let scores: Vec<f64> = samples.iter().map(|s| s.score).collect();
    let quartiles = quartiles(&scores);
    let outliers = detect_outliers(samples, &quartiles);
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    Ok(StatisticalSummary {
        mean: mean(&scores),
        median: median(&scores),
        standard_deviation: population_std_dev(&scores),
        min,
        max,
        quartiles,
        outliers,
    })
}

fn sorted_ascending(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
