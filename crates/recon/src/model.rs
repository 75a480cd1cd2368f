use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use provjera_core::Cell;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// The three inputs the engine reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Roster,
    Timeclock,
    Travel,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Roster, SourceKind::Timeclock, SourceKind::Travel];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Roster => write!(f, "roster"),
            Self::Timeclock => write!(f, "timeclock"),
            Self::Travel => write!(f, "travel"),
        }
    }
}

/// Join key normalization: surrounding whitespace removed, upper-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Roster cell content: hours worked, an absence code, or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceValue {
    Numeric(f64),
    Code(String),
    Empty,
}

impl AttendanceValue {
    pub fn from_cell(cell: &Cell) -> Self {
        if let Some(n) = cell.as_number() {
            return Self::Numeric(n);
        }
        match cell.trimmed_text() {
            Some(code) => Self::Code(code),
            None => Self::Empty,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    pub fn to_cell(&self) -> Cell {
        match self {
            Self::Numeric(n) => Cell::Number(*n),
            Self::Code(code) => Cell::text(code.clone()),
            Self::Empty => Cell::Empty,
        }
    }
}

/// One employee-day from the roster grid, before the month is known.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterFact {
    pub employee_id: u32,
    pub name: String,
    pub day: u32,
    pub value: AttendanceValue,
}

/// A roster fact with its calendar date resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedRosterFact {
    pub fact: RosterFact,
    pub date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Timeclock
// ---------------------------------------------------------------------------

/// Section metadata, in first-seen key order. Re-setting a key keeps its
/// position and replaces the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: Vec<(String, Cell)>,
}

impl Metadata {
    pub fn insert(&mut self, key: impl Into<String>, value: Cell) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fixed names of the eight detail slots, in sheet order.
pub const DETAIL_COLUMNS: [&str; 8] = [
    "Dan",
    "Datum",
    "Početak",
    "Unnamed 1",
    "Kraj",
    "Unnamed 2",
    "Ukupno",
    "Statistika",
];

pub const DATE_SLOT: usize = 1;
pub const STATUS_SLOT: usize = 7;

/// One detail row of the timeclock export with the metadata of its section.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeclockFact {
    /// Snapshot taken at the section marker; shared by every row of the section.
    pub metadata: Arc<Metadata>,
    /// Upper-cased, trimmed value of the person key.
    pub employee_name: Option<String>,
    /// Raw detail slots as they appeared in the sheet.
    pub fields: [Cell; 8],
    /// Date slot after forward-fill.
    pub date_cell: Cell,
    pub date: Option<NaiveDate>,
    pub status_label: Option<String>,
}

// ---------------------------------------------------------------------------
// Travel
// ---------------------------------------------------------------------------

/// One calendar day covered by a travel order.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelFact {
    pub employee_name: String,
    pub date: NaiveDate,
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// One (employee, date) row of the reconciled view.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRow {
    /// Display name, as written by the first source that contributed the row.
    pub employee_name: String,
    /// Normalized join key.
    pub key: String,
    pub date: NaiveDate,
    pub travel_reason: Option<String>,
    pub attendance: Option<AttendanceValue>,
    pub status_label: Option<String>,
}

impl ReconciledRow {
    pub fn is_numeric(&self) -> bool {
        self.attendance.as_ref().is_some_and(AttendanceValue::is_numeric)
    }
}

/// The two discrepancy reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Roster shows hours, timeclock shows absence (or nothing), no travel order.
    UnexplainedAbsence,
    /// Timeclock shows a non-absence status, roster has no hours.
    UnexplainedNonNumeric,
}

impl DiscrepancyKind {
    pub const ALL: [DiscrepancyKind; 2] = [Self::UnexplainedAbsence, Self::UnexplainedNonNumeric];
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexplainedAbsence => write!(f, "unexplained_absence"),
            Self::UnexplainedNonNumeric => write!(f, "unexplained_non_numeric"),
        }
    }
}
