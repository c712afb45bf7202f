use chrono::NaiveDate;
use serde::Serialize;

use crate::models::TrainingSession;

/// Inclusive calendar-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Closes a half-open request against the span of the data, the way the
    /// date picker defaults to the first and last session.
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        bounds: Option<DateRange>,
    ) -> Option<DateRange> {
        match (from, to) {
            (None, None) => None,
            (Some(start), Some(end)) => Some(DateRange::new(start, end)),
            (Some(start), None) => {
                let end = bounds.map_or(start, |b| b.end);
                Some(DateRange::new(start, end))
            }
            (None, Some(end)) => {
                let start = bounds.map_or(end, |b| b.start);
                Some(DateRange::new(start, end))
            }
        }
    }
}

/// Sessions of `advisor`, restricted to `range` when one is given.
///
/// Undated sessions only survive without a range. The result is ordered by
/// date with undated sessions last; ties keep their dataset order.
pub fn filter_sessions<'a>(
    sessions: &'a [TrainingSession],
    advisor: &str,
    range: Option<DateRange>,
) -> Vec<&'a TrainingSession> {
    let mut selected: Vec<&TrainingSession> = sessions
        .iter()
        .filter(|session| session.advisor_name.as_deref() == Some(advisor))
        .filter(|session| match (range, session.date()) {
            (None, _) => true,
            (Some(range), Some(date)) => range.contains(date),
            (Some(_), None) => false,
        })
        .collect();

    selected.sort_by_key(|session| (session.date().is_none(), session.date()));
    selected
}

/// Earliest and latest parseable session dates.
pub fn date_bounds(sessions: &[TrainingSession]) -> Option<DateRange> {
    let mut dates = sessions.iter().filter_map(TrainingSession::date);
    let first = dates.next()?;
    let (start, end) = dates.fold((first, first), |(start, end), date| {
        (start.min(date), end.max(date))
    });
    Some(DateRange::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CriterionNotes, CriterionScores, Field};

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn session(row: usize, advisor: &str, date: Option<NaiveDate>) -> TrainingSession {
        TrainingSession {
            row,
            id: Field::Missing,
            advisor_name: Some(advisor.to_string()),
            evaluator_name: Field::Missing,
            session_date: date.map_or(Field::Invalid("??".to_string()), Field::Present),
            duration_minutes: Field::Missing,
            criterion_scores: CriterionScores::default(),
            criterion_notes: CriterionNotes::default(),
            compliance: Field::Missing,
            unmet_commandments: Field::Missing,
            comments: Field::Missing,
            composite_score: None,
        }
    }

    fn rows(selected: &[&TrainingSession]) -> Vec<usize> {
        selected.iter().map(|s| s.row).collect()
    }

    fn sample() -> Vec<TrainingSession> {
        vec![
            session(0, "Avery Lee", Some(ymd(2024, 1, 5))),
            session(1, "Avery Lee", None),
            session(2, "Jules Moreno", Some(ymd(2024, 1, 1))),
            session(3, "Avery Lee", Some(ymd(2024, 1, 2))),
            session(4, "Avery Lee", Some(ymd(2024, 1, 5))),
            session(5, "Avery Lee", None),
        ]
    }

    #[test]
    fn orders_by_date_with_undated_last() {
        let sessions = sample();
        let selected = filter_sessions(&sessions, "Avery Lee", None);
        assert_eq!(rows(&selected), vec![3, 0, 4, 1, 5]);
    }

    #[test]
    fn range_is_inclusive_and_drops_undated() {
        let sessions = sample();
        let range = DateRange::new(ymd(2024, 1, 2), ymd(2024, 1, 5));
        let selected = filter_sessions(&sessions, "Avery Lee", Some(range));
        assert_eq!(rows(&selected), vec![3, 0, 4]);

        let range = DateRange::new(ymd(2024, 1, 3), ymd(2024, 1, 4));
        assert!(filter_sessions(&sessions, "Avery Lee", Some(range)).is_empty());
    }

    #[test]
    fn inverted_range_selects_nothing() {
        let sessions = sample();
        let range = DateRange::new(ymd(2024, 2, 1), ymd(2024, 1, 1));
        assert!(filter_sessions(&sessions, "Avery Lee", Some(range)).is_empty());
    }

    #[test]
    fn unknown_advisor_selects_nothing() {
        let sessions = sample();
        assert!(filter_sessions(&sessions, "Kiara Patel", None).is_empty());
        assert!(filter_sessions(&sessions, "avery lee", None).is_empty());
    }

    #[test]
    fn bounds_ignore_undated_sessions() {
        let sessions = sample();
        assert_eq!(
            date_bounds(&sessions),
            Some(DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 5)))
        );
        assert_eq!(date_bounds(&sessions[1..2]), None);
    }

    #[test]
    fn half_open_range_closes_on_bounds() {
        let bounds = Some(DateRange::new(ymd(2024, 1, 1), ymd(2024, 6, 30)));

        assert_eq!(DateRange::resolve(None, None, bounds), None);
        assert_eq!(
            DateRange::resolve(Some(ymd(2024, 3, 1)), None, bounds),
            Some(DateRange::new(ymd(2024, 3, 1), ymd(2024, 6, 30)))
        );
        assert_eq!(
            DateRange::resolve(None, Some(ymd(2024, 3, 1)), bounds),
            Some(DateRange::new(ymd(2024, 1, 1), ymd(2024, 3, 1)))
        );
        assert_eq!(
            DateRange::resolve(Some(ymd(2024, 3, 1)), None, None),
            Some(DateRange::new(ymd(2024, 3, 1), ymd(2024, 3, 1)))
        );
    }
}
