use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::aggregate;
use crate::config::{DisplayConfig, SchemaConfig};
use crate::dataset::Dataset;
use crate::filter::{self, DateRange};
use crate::models::{AggregateReport, Criterion, TrainingSession};
use crate::normalize;

/// Everything the presentation layer needs for one advisor selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub advisor: String,
    pub date_range: Option<DateRange>,
    pub summary: AggregateReport,
    pub sessions: Vec<TrainingSession>,
}

/// Distinct advisor names, sorted.
pub fn list_advisors(sessions: &[TrainingSession]) -> BTreeSet<String> {
    sessions
        .iter()
        .filter_map(|s| s.advisor_name.clone())
        .collect()
}

/// Normalizes `dataset` once, closes a one-sided `from`/`to` window on the
/// data's date bounds, then assembles the report.
pub fn build_report(
    dataset: &Dataset,
    schema: &SchemaConfig,
    advisor: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> SessionReport {
    let sessions = normalize::normalize_dataset(dataset, schema);
    let range = DateRange::resolve(from, to, filter::date_bounds(&sessions));
    assemble_report(&sessions, advisor, range)
}

/// Filters and aggregates sessions that were already normalized.
pub fn assemble_report(
    sessions: &[TrainingSession],
    advisor: &str,
    range: Option<DateRange>,
) -> SessionReport {
    let selected = filter::filter_sessions(sessions, advisor, range);
    let summary = aggregate::aggregate(&selected);

    info!(
        advisor,
        sessions = summary.session_count,
        "assembled report"
    );

    SessionReport {
        advisor: advisor.to_string(),
        date_range: range,
        summary,
        sessions: selected.into_iter().cloned().collect(),
    }
}

pub fn render_json(report: &SessionReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_markdown(report: &SessionReport, display: &DisplayConfig) -> String {
    let summary = &report.summary;
    let mut output = String::new();

    let _ = writeln!(output, "# Training Report: {}", report.advisor);
    match report.date_range {
        Some(range) => {
            let _ = writeln!(
                output,
                "Sessions from {} to {}",
                format_date(Some(range.start), display),
                format_date(Some(range.end), display)
            );
        }
        None => {
            let _ = writeln!(output, "All recorded sessions");
        }
    }
    let _ = writeln!(output);

    if summary.session_count == 0 {
        let _ = writeln!(output, "No data for the selected advisor and filters.");
        return output;
    }

    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Sessions: {}", summary.session_count);
    let _ = writeln!(
        output,
        "- Total duration (min): {}",
        format_metric(summary.total_duration, 1, display)
    );
    let _ = writeln!(
        output,
        "- Mean duration (min): {}",
        format_metric(summary.mean_duration, 1, display)
    );
    let _ = writeln!(
        output,
        "- Mean composite score: {}",
        format_metric(summary.mean_composite_score, 2, display)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sessions by Date");
    if summary.sessions_by_date.is_empty() {
        let _ = writeln!(output, "No dated sessions.");
    } else {
        for entry in &summary.sessions_by_date {
            let minutes = summary
                .duration_by_date
                .iter()
                .find(|total| total.date == entry.date)
                .map(|total| total.total);
            let _ = writeln!(
                output,
                "- {}: {} sessions, {} min",
                format_date(Some(entry.date), display),
                entry.count,
                format_metric(minutes, 1, display)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Criterion Averages");
    for mean in &summary.criterion_means {
        let points = summary
            .criterion_series
            .iter()
            .find(|series| series.criterion == mean.criterion)
            .map_or(0, |series| series.points.len());
        let _ = writeln!(
            output,
            "- {}: {} ({} dated scores)",
            mean.criterion,
            format_metric(mean.mean, 2, display),
            points
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Commandment Compliance");
    if summary.compliance_breakdown.is_empty() {
        let _ = writeln!(output, "No records.");
    } else {
        for answer in &summary.compliance_breakdown {
            let _ = writeln!(output, "- {}: {}", answer.label, answer.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Unmet Commandments");
    if summary.commandment_tally.is_empty() {
        let _ = writeln!(output, "No records.");
    } else {
        for commandment in &summary.commandment_tally {
            let _ = writeln!(output, "- {}: {}", commandment.label, commandment.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Session Detail");
    for session in &report.sessions {
        write_session(&mut output, session, display);
    }

    output
}

fn write_session(output: &mut String, session: &TrainingSession, display: &DisplayConfig) {
    let fallback = display.fallback.as_str();

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "### Session of {} - Evaluator: {} - Duration: {} min",
        format_date(session.date(), display),
        session.evaluator_name.display(fallback),
        session.duration_minutes.display(fallback)
    );
    let _ = writeln!(output, "- ID: {}", session.id.display(fallback));
    for criterion in Criterion::ALL {
        let _ = writeln!(
            output,
            "- {}: {} (notes: {})",
            criterion,
            session.criterion_scores.get(criterion).display(fallback),
            session.criterion_notes.get(criterion).display(fallback)
        );
    }
    let _ = writeln!(
        output,
        "- Composite score: {}",
        format_metric(session.composite_score, 2, display)
    );
    let _ = writeln!(
        output,
        "- Meets all six commandments: {}",
        session.compliance.display(fallback)
    );
    let _ = writeln!(
        output,
        "- Unmet commandments: {}",
        session.unmet_commandments.display(fallback)
    );
    let _ = writeln!(output, "- Comments: {}", session.comments.display(fallback));
}

/// One line per advisor: sessions, minutes and mean composite score.
pub fn render_overview(
    sessions: &[TrainingSession],
    range: Option<DateRange>,
    display: &DisplayConfig,
) -> String {
    let advisors = list_advisors(sessions);
    let mut output = String::new();

    let _ = writeln!(output, "# Training Overview");
    let _ = writeln!(output);

    if advisors.is_empty() {
        let _ = writeln!(output, "No advisors recorded.");
        return output;
    }

    let _ = writeln!(
        output,
        "| Advisor | Sessions | Total duration (min) | Mean composite score |"
    );
    let _ = writeln!(output, "|---|---|---|---|");
    for advisor in &advisors {
        let report = assemble_report(sessions, advisor, range);
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            advisor,
            report.summary.session_count,
            format_metric(report.summary.total_duration, 1, display),
            format_metric(report.summary.mean_composite_score, 2, display)
        );
    }

    output
}

pub fn format_date(date: Option<NaiveDate>, display: &DisplayConfig) -> String {
    match date {
        Some(date) => date.format(&display.date_format).to_string(),
        None => display.unknown_date.clone(),
    }
}

fn format_metric(value: Option<f64>, precision: usize, display: &DisplayConfig) -> String {
    match value {
        Some(value) => format!("{value:.precision$}"),
        None => display.fallback.clone(),
    }
}
