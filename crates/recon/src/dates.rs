use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use provjera_core::Cell;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{DatedRosterFact, RosterFact, TimeclockFact};

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// The reporting month every roster day number is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPeriod {
    year: i32,
    month: u32,
}

impl TryFrom<RawPeriod> for Period {
    type Error = String;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Period::new(raw.year, raw.month)
            .ok_or_else(|| format!("invalid period {}-{:02}", raw.year, raw.month))
    }
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar date of `day` in this month, if it exists.
    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = String;

    /// Accepts `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in '{s}'"))?;
        Period::new(year, month).ok_or_else(|| format!("invalid period '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

// Two-digit years first: "%Y" would otherwise read "24" as year 24.
const DATE_FORMATS: &[&str] = &["%d.%m.%y", "%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M:%S", "%d.%m.%Y %H:%M"];

/// Read a calendar date from a cell. Text is parsed day-first; a trailing
/// dot ("05.03.2024.") is tolerated. Bare numbers are not dates.
pub fn parse_date_cell(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(_) | Cell::DateTime(_) => cell.as_date(),
        Cell::Text(s) => parse_date_text(s),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Reporting month taken from the first timeclock fact, which must carry a date.
pub fn resolve_period(facts: &[TimeclockFact]) -> Result<Period, ReconError> {
    let first = facts
        .first()
        .ok_or_else(|| ReconError::PeriodUnresolved("timeclock export contains no detail rows".into()))?;
    let first = first.date.ok_or_else(|| {
        ReconError::PeriodUnresolved("first timeclock row has no parseable date".into())
    })?;
    let period = Period::of(first);
    tracing::info!(%period, "reporting period resolved from timeclock");
    Ok(period)
}

/// Latest timeclock date; reports never look past it.
pub fn max_timeclock_date(facts: &[TimeclockFact]) -> Option<NaiveDate> {
    facts.iter().filter_map(|f| f.date).max()
}

/// Attach calendar dates to roster facts. A day that does not exist in the
/// month is an error, not a silent drop.
pub fn date_roster(facts: &[RosterFact], period: Period) -> Result<Vec<DatedRosterFact>, ReconError> {
    facts
        .iter()
        .map(|fact| {
            let date = period.date(fact.day).ok_or(ReconError::InvalidRosterDay {
                day: fact.day,
                year: period.year,
                month: period.month,
            })?;
            Ok(DatedRosterFact {
                fact: fact.clone(),
                date,
            })
        })
        .collect()
}
