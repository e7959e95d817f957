use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::models::{ParticipantRecord, TestScore, TraitScore, DEFAULT_TRAIT_CATEGORY};

pub const COMPLETED_STATUS: &str = "completed";

/// One attempt row as loaded from storage or a CSV import.
#[derive(Debug, Clone)]
pub struct AttemptRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub test_id: Uuid,
    pub test_name: String,
    pub time_limit_minutes: Option<i32>,
    pub status: String,
    pub raw_score: Option<f64>,
    pub scaled_score: Option<f64>,
    pub percentile: Option<f64>,
    pub time_spent_seconds: Option<f64>,
    pub traits: Option<Value>,
}

impl AttemptRow {
    fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case(COMPLETED_STATUS)
    }
}

/// Validates a loosely typed trait payload. Accepts an array of trait
/// objects, a `{name: score}` map, or a string holding either as JSON.
/// Malformed entries are skipped.
pub fn parse_trait_payload(payload: &Value) -> Vec<TraitScore> {
    match payload {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::String(_)) | Err(_) => {
                warn!(payload = %raw, "trait payload is not valid JSON");
                Vec::new()
            }
            Ok(inner) => parse_trait_payload(&inner),
        },
        Value::Array(items) => items.iter().filter_map(parse_trait_object).collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(name, score)| match numeric(score) {
                Some(score) => Some(TraitScore {
                    name: name.clone(),
                    category: DEFAULT_TRAIT_CATEGORY.to_string(),
                    score,
                }),
                None => {
                    warn!(trait_name = %name, "skipping trait without a numeric score");
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(payload = %other, "unsupported trait payload");
            Vec::new()
        }
    }
}

fn parse_trait_object(item: &Value) -> Option<TraitScore> {
    let name = item
        .get("name")
        .or_else(|| item.get("trait_name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let score = item
        .get("score")
        .or_else(|| item.get("value"))
        .and_then(numeric);

    match (name, score) {
        (Some(name), Some(score)) => Some(TraitScore {
            name: name.to_string(),
            category: item
                .get("category")
                .and_then(Value::as_str)
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(DEFAULT_TRAIT_CATEGORY)
                .to_string(),
            score,
        }),
        _ => {
            warn!(entry = %item, "skipping malformed trait entry");
            None
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Drops NaN and infinite values so they never reach the statistics.
fn finite(value: Option<f64>, field: &str, row: &AttemptRow) -> Option<f64> {
    match value {
        Some(v) if !v.is_finite() => {
            warn!(field, participant = %row.email, test = %row.test_name, "skipping non-finite value");
            None
        }
        other => other,
    }
}

#[derive(Default)]
struct Accumulator {
    record: Option<ParticipantRecord>,
    scaled: Vec<f64>,
    raw: Vec<f64>,
    percentiles: Vec<f64>,
    trait_order: Vec<(String, String)>,
    trait_scores: HashMap<String, Vec<f64>>,
}

/// Folds attempt rows into one record per participant, in the order
/// participants first appear.
pub fn aggregate_attempts(rows: &[AttemptRow]) -> Vec<ParticipantRecord> {
    let mut positions: HashMap<Uuid, usize> = HashMap::new();
    let mut accumulators: Vec<Accumulator> = Vec::new();

    for row in rows {
        let position = *positions.entry(row.user_id).or_insert_with(|| {
            accumulators.push(Accumulator::default());
            accumulators.len() - 1
        });
        let acc = &mut accumulators[position];
        let record = acc.record.get_or_insert_with(|| ParticipantRecord {
            user_id: row.user_id,
            name: row.full_name.clone(),
            email: row.email.clone(),
            overall_score: None,
            overall_raw_score: None,
            overall_percentile: None,
            completed_attempts: 0,
            total_attempts: 0,
            total_time_seconds: 0.0,
            expected_time_seconds: 0.0,
            traits: Vec::new(),
            test_scores: Vec::new(),
        });

        record.total_attempts += 1;
        record.total_time_seconds += finite(row.time_spent_seconds, "time_spent_seconds", row)
            .unwrap_or(0.0)
            .max(0.0);
        record.expected_time_seconds += row.time_limit_minutes.unwrap_or(0).max(0) as f64 * 60.0;

        if !row.is_completed() {
            continue;
        }
        record.completed_attempts += 1;

        if let Some(score) = finite(row.scaled_score, "scaled_score", row) {
            acc.scaled.push(score);
            record.test_scores.push(TestScore {
                test_id: row.test_id,
                test_name: row.test_name.clone(),
                score,
            });
        }
        acc.raw.extend(finite(row.raw_score, "raw_score", row));
        acc.percentiles.extend(finite(row.percentile, "percentile", row));

        for trait_score in row.traits.as_ref().map(parse_trait_payload).unwrap_or_default() {
            let scores = acc.trait_scores.entry(trait_score.name.clone()).or_default();
            if scores.is_empty() {
                acc.trait_order.push((trait_score.name.clone(), trait_score.category.clone()));
            }
            scores.push(trait_score.score);
        }
    }

    accumulators
        .into_iter()
        .filter_map(|acc| {
            let mut record = acc.record?;
            record.overall_score = average(&acc.scaled);
            record.overall_raw_score = average(&acc.raw);
            record.overall_percentile = average(&acc.percentiles);
            record.traits = acc
                .trait_order
                .into_iter()
                .map(|(name, category)| {
                    let score = average(&acc.trait_scores[&name]).unwrap_or(0.0);
                    TraitScore {
                        name,
                        category,
                        score,
                    }
                })
                .collect();
            Some(record)
        })
        .filter(|record| record.total_attempts > 0)
        .collect()
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
