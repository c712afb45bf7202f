use std::fmt;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single spreadsheet cell as handed over by the loader.
///
/// A cell that is not present at all (short CSV row, `null` in JSON) is
/// simply not stored in the row.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Blank,
}

/// Result of parsing one cell into a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Present(T),
    /// The cell exists but holds nothing (empty or whitespace only).
    Blank,
    /// The column or the cell is absent.
    Missing,
    /// The cell holds something that does not parse; the raw text is kept.
    Invalid(String),
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Present(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: fmt::Display> Field<T> {
    /// Renders the cell for detail views. Blank and missing cells collapse to
    /// `fallback`; invalid cells are shown as they were typed.
    pub fn display(&self, fallback: &str) -> String {
        match self {
            Field::Present(value) => value.to_string(),
            Field::Invalid(raw) => raw.clone(),
            Field::Blank | Field::Missing => fallback.to_string(),
        }
    }
}

/// Present values serialize as themselves and invalid cells as their raw
/// text. Blank and missing cells become `null`.
impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Present(value) => value.serialize(serializer),
            Field::Invalid(raw) => serializer.serialize_str(raw),
            Field::Blank | Field::Missing => serializer.serialize_none(),
        }
    }
}

/// The five expertise criteria scored in every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Criterion {
    Presentation,
    Probing,
    Argumentation,
    Rebuttal,
    Closing,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Presentation,
        Criterion::Probing,
        Criterion::Argumentation,
        Criterion::Rebuttal,
        Criterion::Closing,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Presentation => write!(f, "Presentation"),
            Criterion::Probing => write!(f, "Probing"),
            Criterion::Argumentation => write!(f, "Argumentation"),
            Criterion::Rebuttal => write!(f, "Rebuttal"),
            Criterion::Closing => write!(f, "Closing"),
        }
    }
}

/// One cell per criterion, indexed by [`Criterion`].
#[derive(Debug, Clone, PartialEq)]
pub struct ByCriterion<T> {
    cells: [Field<T>; 5],
}

/// Per-criterion expertise levels of one session.
pub type CriterionScores = ByCriterion<f64>;

/// Per-criterion written observations of one session.
pub type CriterionNotes = ByCriterion<String>;

impl<T> Default for ByCriterion<T> {
    fn default() -> Self {
        Self {
            cells: std::array::from_fn(|_| Field::Missing),
        }
    }
}

impl<T> ByCriterion<T> {
    pub fn get(&self, criterion: Criterion) -> &Field<T> {
        &self.cells[criterion.index()]
    }

    pub fn set(&mut self, criterion: Criterion, cell: Field<T>) {
        self.cells[criterion.index()] = cell;
    }
}

impl ByCriterion<f64> {
    /// Criteria that carry a numeric value, in fixed criterion order.
    pub fn present(&self) -> impl Iterator<Item = (Criterion, f64)> + '_ {
        Criterion::ALL
            .into_iter()
            .filter_map(|criterion| self.get(criterion).value().map(|v| (criterion, *v)))
    }
}

impl<T: Serialize> Serialize for ByCriterion<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Criterion::ALL.len()))?;
        for criterion in Criterion::ALL {
            map.serialize_entry(&criterion, self.get(criterion))?;
        }
        map.end()
    }
}

/// One evaluated training session after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSession {
    /// Position of the row in the loaded dataset.
    pub row: usize,
    pub id: Field<String>,
    pub advisor_name: Option<String>,
    pub evaluator_name: Field<String>,
    pub session_date: Field<NaiveDate>,
    pub duration_minutes: Field<f64>,
    pub criterion_scores: CriterionScores,
    pub criterion_notes: CriterionNotes,
    pub compliance: Field<String>,
    pub unmet_commandments: Field<String>,
    pub comments: Field<String>,
    pub composite_score: Option<f64>,
}

impl TrainingSession {
    pub fn date(&self) -> Option<NaiveDate> {
        self.session_date.value().copied()
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration_minutes.value().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateTotal {
    pub date: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionSeries {
    pub criterion: Criterion,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionMean {
    pub criterion: Criterion,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub label: String,
    pub count: usize,
}

/// Statistics over one filtered set of sessions. `None` marks an aggregate
/// with no contributing session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub session_count: usize,
    pub total_duration: Option<f64>,
    pub mean_duration: Option<f64>,
    pub mean_composite_score: Option<f64>,
    pub sessions_by_date: Vec<DateCount>,
    pub duration_by_date: Vec<DateTotal>,
    pub criterion_series: Vec<CriterionSeries>,
    pub criterion_means: Vec<CriterionMean>,
    pub composite_series: Vec<SeriesPoint>,
    pub compliance_breakdown: Vec<TagCount>,
    pub commandment_tally: Vec<TagCount>,
}
