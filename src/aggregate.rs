use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::{
    AggregateReport, Criterion, CriterionMean, CriterionSeries, DateCount, DateTotal,
    SeriesPoint, TagCount, TrainingSession,
};

pub fn aggregate(sessions: &[&TrainingSession]) -> AggregateReport {
    let durations: Vec<f64> = sessions.iter().filter_map(|s| s.duration()).collect();
    let total_duration = (!durations.is_empty()).then(|| durations.iter().sum::<f64>());

    AggregateReport {
        session_count: sessions.len(),
        total_duration,
        mean_duration: mean(durations.iter().copied()),
        mean_composite_score: mean(sessions.iter().filter_map(|s| s.composite_score)),
        sessions_by_date: sessions_by_date(sessions),
        duration_by_date: duration_by_date(sessions),
        criterion_series: criterion_series(sessions),
        criterion_means: criterion_means(sessions),
        composite_series: composite_series(sessions),
        compliance_breakdown: compliance_breakdown(sessions),
        commandment_tally: commandment_tally(sessions),
    }
}

/// Arithmetic mean, `None` over an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn sessions_by_date(sessions: &[&TrainingSession]) -> Vec<DateCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in sessions.iter().filter_map(|s| s.date()) {
        *counts.entry(date).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| DateCount { date, count })
        .collect()
}

/// Total minutes per day. Days where no session recorded a duration are left out.
pub fn duration_by_date(sessions: &[&TrainingSession]) -> Vec<DateTotal> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for session in sessions {
        if let (Some(date), Some(minutes)) = (session.date(), session.duration()) {
            *totals.entry(date).or_default() += minutes;
        }
    }
    totals
        .into_iter()
        .map(|(date, total)| DateTotal { date, total })
        .collect()
}

/// One point per dated session carrying a value, in session order.
pub fn criterion_series(sessions: &[&TrainingSession]) -> Vec<CriterionSeries> {
    Criterion::ALL
        .into_iter()
        .map(|criterion| CriterionSeries {
            criterion,
            points: sessions
                .iter()
                .filter_map(|s| {
                    let value = s.criterion_scores.get(criterion).value()?;
                    Some(SeriesPoint {
                        date: s.date()?,
                        value: *value,
                    })
                })
                .collect(),
        })
        .collect()
}

pub fn criterion_means(sessions: &[&TrainingSession]) -> Vec<CriterionMean> {
    Criterion::ALL
        .into_iter()
        .map(|criterion| CriterionMean {
            criterion,
            mean: mean(
                sessions
                    .iter()
                    .filter_map(|s| s.criterion_scores.get(criterion).value().copied()),
            ),
        })
        .collect()
}

pub fn composite_series(sessions: &[&TrainingSession]) -> Vec<SeriesPoint> {
    sessions
        .iter()
        .filter_map(|s| {
            Some(SeriesPoint {
                date: s.date()?,
                value: s.composite_score?,
            })
        })
        .collect()
}

/// Splits a free-text list on `,` or `;`, trimming and dropping empty tokens.
pub fn split_tags(text: &str) -> impl Iterator<Item = &str> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Counts exact labels, most frequent first; equal counts keep first-seen order.
pub fn tally<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<TagCount> {
    let mut counts: Vec<TagCount> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    for label in labels {
        match positions.get(label) {
            Some(&position) => counts[position].count += 1,
            None => {
                positions.insert(label, counts.len());
                counts.push(TagCount {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

pub fn commandment_tally(sessions: &[&TrainingSession]) -> Vec<TagCount> {
    tally(
        sessions
            .iter()
            .filter_map(|s| s.unmet_commandments.value())
            .flat_map(|text| split_tags(text)),
    )
}

pub fn compliance_breakdown(sessions: &[&TrainingSession]) -> Vec<TagCount> {
    tally(
        sessions
            .iter()
            .filter_map(|s| s.compliance.value())
            .map(|answer| answer.trim()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CriterionNotes, CriterionScores, Field};

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample_session(date: Option<NaiveDate>, minutes: Option<f64>) -> TrainingSession {
        TrainingSession {
            row: 0,
            id: Field::Missing,
            advisor_name: Some("Avery Lee".to_string()),
            evaluator_name: Field::Present("Kiara Patel".to_string()),
            session_date: date.map_or(Field::Missing, Field::Present),
            duration_minutes: minutes.map_or(Field::Blank, Field::Present),
            criterion_scores: CriterionScores::default(),
            criterion_notes: CriterionNotes::default(),
            compliance: Field::Missing,
            unmet_commandments: Field::Missing,
            comments: Field::Missing,
            composite_score: None,
        }
    }

    fn with_commandments(text: &str) -> TrainingSession {
        let mut session = sample_session(Some(ymd(2024, 1, 1)), None);
        session.unmet_commandments = if text.is_empty() {
            Field::Blank
        } else {
            Field::Present(text.to_string())
        };
        session
    }

    fn tags(pairs: &[(&str, usize)]) -> Vec<TagCount> {
        pairs
            .iter()
            .map(|(label, count)| TagCount {
                label: label.to_string(),
                count: *count,
            })
            .collect()
    }

    #[test]
    fn groups_sessions_and_minutes_by_day() {
        let sessions = vec![
            sample_session(Some(ymd(2024, 1, 1)), Some(10.0)),
            sample_session(Some(ymd(2024, 1, 1)), Some(20.0)),
            sample_session(Some(ymd(2024, 1, 2)), Some(5.0)),
        ];
        let refs: Vec<&TrainingSession> = sessions.iter().collect();
        let report = aggregate(&refs);

        assert_eq!(report.session_count, 3);
        assert_eq!(
            report.sessions_by_date,
            vec![
                DateCount { date: ymd(2024, 1, 1), count: 2 },
                DateCount { date: ymd(2024, 1, 2), count: 1 },
            ]
        );
        assert_eq!(
            report.duration_by_date,
            vec![
                DateTotal { date: ymd(2024, 1, 1), total: 30.0 },
                DateTotal { date: ymd(2024, 1, 2), total: 5.0 },
            ]
        );
        assert_eq!(report.total_duration, Some(35.0));
        let mean = report.mean_duration.unwrap();
        assert!((mean - 35.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn missing_durations_leave_the_denominator() {
        let sessions = vec![
            sample_session(Some(ymd(2024, 1, 1)), Some(10.0)),
            sample_session(Some(ymd(2024, 1, 2)), None),
            sample_session(None, Some(30.0)),
        ];
        let refs: Vec<&TrainingSession> = sessions.iter().collect();
        let report = aggregate(&refs);

        assert_eq!(report.total_duration, Some(40.0));
        assert_eq!(report.mean_duration, Some(20.0));
        assert_eq!(
            report.sessions_by_date,
            vec![
                DateCount { date: ymd(2024, 1, 1), count: 1 },
                DateCount { date: ymd(2024, 1, 2), count: 1 },
            ]
        );
        assert_eq!(
            report.duration_by_date,
            vec![DateTotal { date: ymd(2024, 1, 1), total: 10.0 }]
        );
    }

    #[test]
    fn empty_selection_is_all_undefined() {
        let report = aggregate(&[]);
        assert_eq!(report.session_count, 0);
        assert_eq!(report.total_duration, None);
        assert_eq!(report.mean_duration, None);
        assert_eq!(report.mean_composite_score, None);
        assert!(report.sessions_by_date.is_empty());
        assert!(report.commandment_tally.is_empty());
        assert!(report.criterion_means.iter().all(|m| m.mean.is_none()));
        assert!(report.criterion_series.iter().all(|s| s.points.is_empty()));
    }

    #[test]
    fn commandments_split_on_comma_and_semicolon() {
        let sessions = vec![
            with_commandments("A, B"),
            with_commandments("B;C"),
            with_commandments(""),
        ];
        let refs: Vec<&TrainingSession> = sessions.iter().collect();
        let tally = commandment_tally(&refs);

        assert_eq!(tally, tags(&[("B", 2), ("A", 1), ("C", 1)]));
        assert_eq!(tally.iter().map(|t| t.count).sum::<usize>(), 4);
    }

    #[test]
    fn tally_is_case_sensitive_and_skips_empty_tokens() {
        let sessions = vec![
            with_commandments(" Escucha ;; escucha,"),
            with_commandments("Cierre , Escucha"),
        ];
        let refs: Vec<&TrainingSession> = sessions.iter().collect();

        assert_eq!(
            commandment_tally(&refs),
            tags(&[("Escucha", 2), ("escucha", 1), ("Cierre", 1)])
        );
    }

    #[test]
    fn criterion_series_skips_missing_values() {
        let mut first = sample_session(Some(ymd(2024, 1, 1)), None);
        first.criterion_scores.set(Criterion::Closing, Field::Present(3.0));
        first.composite_score = Some(3.0);
        let mut second = sample_session(Some(ymd(2024, 1, 3)), None);
        second.criterion_scores.set(Criterion::Closing, Field::Present(5.0));
        second.criterion_scores.set(Criterion::Probing, Field::Present(1.0));
        second.composite_score = Some(3.0);
        let mut undated = sample_session(None, None);
        undated.criterion_scores.set(Criterion::Closing, Field::Present(1.0));
        undated.composite_score = Some(1.0);

        let sessions = vec![first, second, undated];
        let refs: Vec<&TrainingSession> = sessions.iter().collect();
        let report = aggregate(&refs);

        let closing = &report.criterion_series[4];
        assert_eq!(closing.criterion, Criterion::Closing);
        assert_eq!(
            closing.points,
            vec![
                SeriesPoint { date: ymd(2024, 1, 1), value: 3.0 },
                SeriesPoint { date: ymd(2024, 1, 3), value: 5.0 },
            ]
        );
        assert_eq!(report.criterion_series[1].points.len(), 1);
        assert!(report.criterion_series[0].points.is_empty());

        assert_eq!(report.criterion_means[4].mean, Some(3.0));
        assert_eq!(report.criterion_means[0].mean, None);
        assert_eq!(report.composite_series.len(), 2);
        assert_eq!(report.mean_composite_score, Some(7.0 / 3.0));
    }

    #[test]
    fn compliance_answers_counted_verbatim() {
        let mut yes = sample_session(None, None);
        yes.compliance = Field::Present("Sí".to_string());
        let mut no = sample_session(None, None);
        no.compliance = Field::Present("No ".to_string());
        let blank = sample_session(None, None);

        let sessions = vec![no, yes.clone(), yes, blank];
        let refs: Vec<&TrainingSession> = sessions.iter().collect();
        assert_eq!(
            compliance_breakdown(&refs),
            tags(&[("Sí", 2), ("No", 1)])
        );
    }

    #[test]
    fn mean_of_nothing_is_undefined() {
        assert_eq!(mean(Vec::new()), None);
        assert_eq!(mean(vec![1.0, 2.0]), Some(1.5));
    }
}
