use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    HighlyRecommended,
    Recommended,
    Conditional,
    NotRecommended,
}

impl RecommendationCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::HighlyRecommended => "Highly recommended",
            Self::Recommended => "Recommended",
            Self::Conditional => "Conditional",
            Self::NotRecommended => "Not recommended",
        }
    }
}

struct Rule {
    category: RecommendationCategory,
    min_score: f64,
    min_completion: f64,
    min_fit: Option<f64>,
}

// Evaluated top to bottom; the first match wins.
const RULES: [Rule; 3] = [
    Rule {
        category: RecommendationCategory::HighlyRecommended,
        min_score: 80.0,
        min_completion: 90.0,
        min_fit: Some(75.0),
    },
    Rule {
        category: RecommendationCategory::Recommended,
        min_score: 70.0,
        min_completion: 80.0,
        min_fit: Some(60.0),
    },
    Rule {
        category: RecommendationCategory::Conditional,
        min_score: 60.0,
        min_completion: 70.0,
        min_fit: None,
    },
];

pub fn categorize(overall_score: f64, completion_rate: f64, position_fit: f64) -> RecommendationCategory {
    RULES
        .iter()
        .find(|rule| {
            overall_score >= rule.min_score
                && completion_rate >= rule.min_completion
                && rule.min_fit.map_or(true, |fit| position_fit >= fit)
        })
        .map(|rule| rule.category)
        .unwrap_or(RecommendationCategory::NotRecommended)
}

pub fn decision_criteria() -> Vec<String> {
    let mut criteria: Vec<String> = RULES
        .iter()
        .map(|rule| match rule.min_fit {
            Some(fit) => format!(
                "{}: score >= {}, completion rate >= {}%, position fit >= {}",
                rule.category.label(),
                rule.min_score,
                rule.min_completion,
                fit
            ),
            None => format!(
                "{}: score >= {}, completion rate >= {}%",
                rule.category.label(),
                rule.min_score,
                rule.min_completion
            ),
        })
        .collect();
    criteria.push(format!(
        "{}: all remaining participants",
        RecommendationCategory::NotRecommended.label()
    ));
    criteria
}
