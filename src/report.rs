use std::collections::HashMap;
use std::fmt::Write;

use uuid::Uuid;

use crate::models::{ComparativeReportData, OutlierKind, PerformanceTier, RecommendedCandidate};

fn tier_title(tier: PerformanceTier) -> &'static str {
    match tier {
        PerformanceTier::HighPerformers => "High performers",
        PerformanceTier::AveragePerformers => "Average performers",
        PerformanceTier::DevelopingPerformers => "Developing performers",
    }
}

/// Every analyzed participant lands in exactly one recommendation list,
/// so those lists double as the name lookup.
fn participant_names(report: &ComparativeReportData) -> HashMap<Uuid, &str> {
    let hiring = &report.hiring_recommendations;
    hiring
        .highly_recommended
        .iter()
        .chain(&hiring.recommended)
        .chain(&hiring.conditional)
        .chain(&hiring.not_recommended)
        .map(|c| (c.participant_id, c.name.as_str()))
        .collect()
}

fn write_candidates(output: &mut String, title: &str, candidates: &[RecommendedCandidate]) {
    let _ = writeln!(output, "### {} ({})", title, candidates.len());
    if candidates.is_empty() {
        let _ = writeln!(output, "None.");
    }
    for candidate in candidates {
        let _ = writeln!(
            output,
            "- #{} {} score {:.1}, completion {:.0}%, fit {:.1}",
            candidate.rank,
            candidate.name,
            candidate.overall_score,
            candidate.completion_rate,
            candidate.position_fit
        );
    }
}

pub fn render_markdown(report: &ComparativeReportData) -> String {
    let mut output = String::new();
    let context = &report.session_context;

    let _ = writeln!(output, "# Comparative Assessment Report");
    let _ = writeln!(
        output,
        "Session {} ({}), {} of {} participants analyzed, ranked by {}",
        context.session.name,
        context.session.code,
        context.analyzed_participants,
        context.total_participants,
        context.comparison_metric.label()
    );
    if let (Some(start), Some(end)) = (context.session.start_date, context.session.end_date) {
        let _ = writeln!(output, "Held {} to {}", start, end);
    }

    let stats = &report.statistical_analysis;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Statistics");
    let _ = writeln!(
        output,
        "- Mean {:.2}, median {:.2}, standard deviation {:.2}",
        stats.mean, stats.median, stats.standard_deviation
    );
    let _ = writeln!(
        output,
        "- Range {:.1} to {:.1}; quartiles {:.1} / {:.1} / {:.1}",
        stats.score_range.min,
        stats.score_range.max,
        stats.quartiles.q1,
        stats.quartiles.q2,
        stats.quartiles.q3
    );
    if stats.outliers.is_empty() {
        let _ = writeln!(output, "- No outliers.");
    }
    let names = participant_names(report);
    for outlier in &stats.outliers {
        let kind = match outlier.kind {
            OutlierKind::HighOutlier => "high",
            OutlierKind::LowOutlier => "low",
        };
        let name = names
            .get(&outlier.participant_id)
            .map(|name| name.to_string())
            .unwrap_or_else(|| outlier.participant_id.to_string());
        let _ = writeln!(output, "- {} outlier: {} ({:.1})", kind, name, outlier.score);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");
    for ranked in &report.top_performers {
        let _ = writeln!(
            output,
            "{}. {} ({}) {:.2}",
            ranked.rank, ranked.participant.name, ranked.participant.email, ranked.metric_value
        );
    }

    if !report.participant_rankings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Full Ranking");
        let _ = writeln!(output, "| Rank | Participant | Score | Completion | Standout | Concerns |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for ranked in &report.participant_rankings {
            let _ = writeln!(
                output,
                "| {} | {} | {:.2} | {:.0}% | {} | {} |",
                ranked.rank,
                ranked.participant.name,
                ranked.metric_value,
                ranked.completion_rate,
                ranked.standout_traits.join(", "),
                ranked.concern_areas.join(", ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Test Comparisons");
    if report.test_comparisons.is_empty() {
        let _ = writeln!(output, "No completed tests with scores.");
    }
    for test in &report.test_comparisons {
        let top: Vec<String> = test
            .top_performers
            .iter()
            .map(|p| format!("{} ({:.1})", p.name, p.score))
            .collect();
        let bottom: Vec<String> = test
            .bottom_performers
            .iter()
            .map(|p| format!("{} ({:.1})", p.name, p.score))
            .collect();
        let histogram: Vec<String> = test
            .score_distribution
            .iter()
            .map(|b| format!("{}: {}", b.range, b.count))
            .collect();
        let _ = writeln!(
            output,
            "### {} ({} participants, avg {:.1})",
            test.test_name, test.participant_count, test.average_score
        );
        let _ = writeln!(output, "- Top: {}", top.join(", "));
        let _ = writeln!(output, "- Bottom: {}", bottom.join(", "));
        let _ = writeln!(output, "- Distribution: {}", histogram.join(", "));
    }

    if !report.trait_distribution.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Trait Distribution");
        for distribution in &report.trait_distribution {
            let d = &distribution.distribution;
            let _ = writeln!(
                output,
                "- {} [{}]: avg {:.1}, variability {:.1}, levels {}/{}/{}/{}/{}",
                distribution.trait_name,
                distribution.category,
                distribution.average_score,
                distribution.variability,
                d.very_low,
                d.low,
                d.average,
                d.high,
                d.very_high
            );
        }
    }

    if let Some(clusters) = &report.cluster_analysis {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## Performance Clusters (validity {:.2})",
            clusters.cluster_validity
        );
        for cluster in &clusters.clusters {
            let members: Vec<&str> = cluster.members.iter().map(|m| m.name.as_str()).collect();
            let _ = writeln!(
                output,
                "- {}: {} participants, avg {:.1} ({})",
                tier_title(cluster.tier),
                cluster.participant_count,
                cluster.average_score,
                members.join(", ")
            );
            if !cluster.characteristics.is_empty() {
                let _ = writeln!(output, "  - Characteristics: {}", cluster.characteristics.join(", "));
            }
        }
    }

    let hiring = &report.hiring_recommendations;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Hiring Recommendations");
    write_candidates(&mut output, "Highly recommended", &hiring.highly_recommended);
    write_candidates(&mut output, "Recommended", &hiring.recommended);
    write_candidates(&mut output, "Conditional", &hiring.conditional);
    write_candidates(&mut output, "Not recommended", &hiring.not_recommended);
    let _ = writeln!(output);
    let _ = writeln!(output, "Decision criteria:");
    for criterion in &hiring.decision_criteria {
        let _ = writeln!(output, "- {}", criterion);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparative::build_comparative_report;
    use crate::config::QueryConfig;
    use crate::models::{ParticipantRecord, SessionBatch, SessionContext};
    use uuid::Uuid;

    fn participant(name: &str, score: f64) -> ParticipantRecord {
        ParticipantRecord {
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            overall_score: Some(score),
            overall_raw_score: None,
            overall_percentile: Some(score),
            completed_attempts: 1,
            total_attempts: 1,
            total_time_seconds: 0.0,
            expected_time_seconds: 0.0,
            traits: Vec::new(),
            test_scores: Vec::new(),
        }
    }

    #[test]
    fn renders_core_sections() {
        let batch = SessionBatch {
            session: SessionContext {
                session_id: Uuid::new_v4(),
                name: "Graduate Intake".to_string(),
                code: "GRAD".to_string(),
                start_date: None,
                end_date: None,
            },
            participants: vec![
                participant("Avery", 92.0),
                participant("Jules", 71.0),
                participant("Kiara", 58.0),
                participant("Noor", 40.0),
            ],
        };
        let config = QueryConfig {
            include_cluster_analysis: true,
            ..QueryConfig::default()
        };
        let report = build_comparative_report(&batch, &config).unwrap();
        let markdown = render_markdown(&report);

        assert!(markdown.starts_with("# Comparative Assessment Report"));
        assert!(markdown.contains("4 of 4 participants analyzed, ranked by scaled score"));
        assert!(markdown.contains("1. Avery (avery@example.com) 92.00"));
        assert!(markdown.contains("## Performance Clusters (validity 0.75)"));
        assert!(markdown.contains("### Highly recommended (1)"));
        assert!(markdown.contains("No completed tests with scores."));
        assert!(!markdown.contains("## Trait Distribution"));
    }

    #[test]
    fn outliers_are_listed_by_name() {
        let scores = [10.0, 50.0, 52.0, 54.0, 56.0, 58.0, 200.0];
        let names = ["Low", "A", "B", "C", "D", "E", "High"];
        let batch = SessionBatch {
            session: SessionContext {
                session_id: Uuid::new_v4(),
                name: "Graduate Intake".to_string(),
                code: "GRAD".to_string(),
                start_date: None,
                end_date: None,
            },
            participants: names
                .iter()
                .zip(scores)
                .map(|(name, score)| participant(name, score))
                .collect(),
        };
        let config = QueryConfig {
            include_rankings: false,
            top_performers_count: 1,
            ..QueryConfig::default()
        };
        let report = build_comparative_report(&batch, &config).unwrap();
        let markdown = render_markdown(&report);

        assert!(markdown.contains("- low outlier: Low (10.0)"));
        assert!(markdown.contains("- high outlier: High (200.0)"));
    }
}
