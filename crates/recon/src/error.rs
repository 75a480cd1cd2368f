use thiserror::Error;

use crate::model::SourceKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty label, bad regex, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A required header is absent from an input sheet.
    #[error("{input}: missing column '{column}'")]
    MissingColumn { input: SourceKind, column: String },
    /// An input needed for the requested outputs was not supplied.
    #[error("{0} input was not supplied")]
    MissingInput(SourceKind),
    /// The reporting month cannot be derived from the timeclock export.
    #[error("cannot resolve reporting period: {0}")]
    PeriodUnresolved(String),
    /// A roster day number does not exist in the resolved month.
    #[error("roster day {day} is not a valid date in {year}-{month:02}")]
    InvalidRosterDay { day: u32, year: i32, month: u32 },
}
