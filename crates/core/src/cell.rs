use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Serialize, Serializer};

/// A single spreadsheet value, as read from any supported container.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric coercion: numbers pass through, text must parse as a decimal
    /// after trimming. Anything else (including blanks) is not numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Calendar date carried by a date or datetime cell.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Display text with surrounding whitespace removed; `None` when blank.
    pub fn trimmed_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        Some(self.to_string().trim().to_string())
    }
}

/// Format a float the way spreadsheet users expect: integers without decimals.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{}", format_number(*n)),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Cell::Date(d) => write!(f, "{}", d.format("%d.%m.%Y")),
            Cell::DateTime(dt) => {
                if dt.time().num_seconds_from_midnight() == 0 {
                    write!(f, "{}", dt.format("%d.%m.%Y"))
                } else {
                    write!(f, "{}", dt.format("%d.%m.%Y %H:%M:%S"))
                }
            }
            Cell::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

// JSON view: numbers stay numbers, blanks become null, the rest is display text.
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_detection() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::text("   ").is_blank());
        assert!(!Cell::text("GO").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Cell::Number(8.0).as_number(), Some(8.0));
        assert_eq!(Cell::text(" 7.5 ").as_number(), Some(7.5));
        assert_eq!(Cell::text("GO").as_number(), None);
        assert_eq!(Cell::text("").as_number(), None);
        assert_eq!(Cell::Number(f64::NAN).as_number(), None);
        assert_eq!(Cell::Bool(true).as_number(), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Cell::Number(12.0).to_string(), "12");
        assert_eq!(Cell::Number(7.25).to_string(), "7.25");
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(Cell::Date(d).to_string(), "05.03.2024");
        assert_eq!(Cell::DateTime(d.and_hms_opt(0, 0, 0).unwrap()).to_string(), "05.03.2024");
        assert_eq!(Cell::Time(NaiveTime::from_hms_opt(7, 30, 0).unwrap()).to_string(), "07:30:00");
    }

    #[test]
    fn trimmed_text_skips_blanks() {
        assert_eq!(Cell::text("  Rad ").trimmed_text().as_deref(), Some("Rad"));
        assert_eq!(Cell::text(" ").trimmed_text(), None);
        assert_eq!(Cell::Empty.trimmed_text(), None);
    }
}
