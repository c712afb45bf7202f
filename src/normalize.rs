//! Raw rows to typed training sessions.
//!
//! Every cell goes through an explicit parse step that yields a tagged
//! [`Field`]; a malformed cell never fails the row.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::config::SchemaConfig;
use crate::dataset::{Dataset, RawRow};
use crate::models::{
    Criterion, CriterionNotes, CriterionScores, Field, RawValue, TrainingSession,
};

/// Day zero of spreadsheet serial dates.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

pub fn normalize_dataset(dataset: &Dataset, schema: &SchemaConfig) -> Vec<TrainingSession> {
    let sessions: Vec<TrainingSession> = dataset
        .rows()
        .iter()
        .enumerate()
        .map(|(row, raw)| normalize_row(row, raw, schema))
        .collect();

    let without_advisor = sessions.iter().filter(|s| s.advisor_name.is_none()).count();
    if without_advisor > 0 {
        warn!(
            rows = without_advisor,
            "rows without an evaluated advisor are left out of advisor views"
        );
    }

    sessions
}

pub fn normalize_row(row: usize, raw: &RawRow, schema: &SchemaConfig) -> TrainingSession {
    let columns = &schema.columns;
    let cell = |column: &str| raw.get(column);

    let mut criterion_scores = CriterionScores::default();
    let mut criterion_notes = CriterionNotes::default();
    for criterion in Criterion::ALL {
        let column = columns.criterion(criterion);
        let score = logged(row, column, parse_number(cell(column)));
        criterion_scores.set(criterion, score);
        criterion_notes.set(
            criterion,
            parse_text(cell(columns.criterion_notes(criterion))),
        );
    }
    let composite_score = composite_score(&criterion_scores);

    let duration_minutes = match parse_number(cell(&columns.duration)) {
        Field::Present(minutes) if minutes < 0.0 => Field::Invalid(minutes.to_string()),
        other => other,
    };

    TrainingSession {
        row,
        id: parse_text(cell(&columns.id)),
        advisor_name: parse_text(cell(&columns.advisor)).value().cloned(),
        evaluator_name: parse_text(cell(&columns.evaluator)),
        session_date: logged(
            row,
            &columns.date,
            parse_date(cell(&columns.date), &schema.date_formats),
        ),
        duration_minutes: logged(row, &columns.duration, duration_minutes),
        criterion_scores,
        criterion_notes,
        compliance: parse_text(cell(&columns.compliance)),
        unmet_commandments: parse_text(cell(&columns.unmet_commandments)),
        comments: parse_text(cell(&columns.comments)),
        composite_score,
    }
}

/// Mean of the criterion levels that are present; `None` when none are.
pub fn composite_score(scores: &CriterionScores) -> Option<f64> {
    let (sum, count) = scores
        .present()
        .fold((0.0, 0usize), |(sum, count), (_, value)| (sum + value, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn logged<T>(row: usize, column: &str, field: Field<T>) -> Field<T> {
    if let Field::Invalid(raw) = &field {
        debug!(row, column, raw = %raw, "unparseable cell");
    }
    field
}

pub fn parse_text(value: Option<&RawValue>) -> Field<String> {
    match value {
        None => Field::Missing,
        Some(RawValue::Blank) => Field::Blank,
        Some(RawValue::Text(text)) if text.trim().is_empty() => Field::Blank,
        Some(RawValue::Text(text)) => Field::Present(text.clone()),
        Some(RawValue::Number(number)) => Field::Present(number.to_string()),
        Some(RawValue::Date(date)) => Field::Present(date.to_string()),
    }
}

pub fn parse_number(value: Option<&RawValue>) -> Field<f64> {
    match value {
        None => Field::Missing,
        Some(RawValue::Blank) => Field::Blank,
        Some(RawValue::Number(number)) if number.is_finite() => Field::Present(*number),
        Some(RawValue::Number(number)) => Field::Invalid(number.to_string()),
        Some(RawValue::Date(date)) => Field::Invalid(date.to_string()),
        Some(RawValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Field::Blank;
            }
            match decimal(trimmed) {
                Some(number) => Field::Present(number),
                None => Field::Invalid(text.clone()),
            }
        }
    }
}

/// Accepts `3.5` as well as the decimal-comma form `3,5`. A comma only reads
/// as a decimal mark when one or two digits follow it, so `1,000` is rejected
/// rather than taken for one.
fn decimal(text: &str) -> Option<f64> {
    let parsed = text.parse::<f64>().ok().or_else(|| {
        let (whole, fraction) = text.split_once(',')?;
        let fraction_ok = (1..=2).contains(&fraction.len())
            && fraction.bytes().all(|b| b.is_ascii_digit());
        if !fraction_ok || whole.contains('.') {
            return None;
        }
        format!("{whole}.{fraction}").parse::<f64>().ok()
    })?;
    parsed.is_finite().then_some(parsed)
}

pub fn parse_date(value: Option<&RawValue>, formats: &[String]) -> Field<NaiveDate> {
    match value {
        None => Field::Missing,
        Some(RawValue::Blank) => Field::Blank,
        Some(RawValue::Date(date)) => Field::Present(*date),
        Some(RawValue::Number(serial)) => match serial_date(*serial) {
            Some(date) => Field::Present(date),
            None => Field::Invalid(serial.to_string()),
        },
        Some(RawValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Field::Blank;
            }
            match date_from_text(trimmed, formats) {
                Some(date) => Field::Present(date),
                None => Field::Invalid(text.clone()),
            }
        }
    }
}

fn date_from_text(text: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|format| {
            NaiveDate::parse_from_str(text, format)
                .or_else(|_| NaiveDateTime::parse_from_str(text, format).map(|dt| dt.date()))
                .ok()
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL_DAY).contains(&serial) {
        return None;
    }
    let (year, month, day) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(year, month, day)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
