use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dates::Period;
use crate::error::ReconError;

/// Upper bound on banner rows above a header. Anything larger is a typo.
pub const MAX_HEADER_ROW: usize = 1000;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Every section has defaults matching the usual MasterTeam, Jantar and
/// travel-register exports, so an empty TOML document is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub roster: RosterConfig,
    pub timeclock: TimeclockConfig,
    pub travel: TravelConfig,
    pub classify: ClassifyConfig,
    /// Fixes the reporting month instead of deriving it from the timeclock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterConfig {
    /// Zero-based row holding the column headers.
    pub header_row: usize,
    pub id_column: String,
    pub name_column: String,
    /// Row numbers above this are footer totals, not employees.
    pub max_id: u32,
    /// Headers matching this pattern are layout placeholders, never day columns.
    pub placeholder_pattern: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            header_row: 3,
            id_column: "Rbr".into(),
            name_column: "PREZIME i IME".into(),
            max_id: 1000,
            placeholder_pattern: "^Unnamed".into(),
        }
    }
}

impl RosterConfig {
    pub fn placeholder_regex(&self) -> Result<Regex, ReconError> {
        Regex::new(&self.placeholder_pattern).map_err(|e| {
            ReconError::ConfigValidation(format!("roster.placeholder_pattern: {e}"))
        })
    }
}

// ---------------------------------------------------------------------------
// Timeclock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeclockConfig {
    /// First-column label that opens a detail section.
    pub section_marker: String,
    /// Metadata key naming the employee.
    pub person_key: String,
    pub metadata_keys: Vec<String>,
    pub skip_labels: Vec<String>,
    pub blank_label_rows: BlankLabelRows,
}

impl Default for TimeclockConfig {
    fn default() -> Self {
        let metadata_keys = [
            "Korisnik",
            "Razdoblje",
            "Odjel",
            "Raspored",
            "Kartica korisnika",
            "Suma",
            "Saldo za razdoblje",
            "Radna obveza",
            "Prekovremeno",
            "Stimulacija",
            "Stanje",
            "Prijenos",
            "Godišnji",
            "Stari godišnji",
            "Dvokratni rad",
            "Broj obroka",
            "Broj prijevoza",
        ];
        Self {
            section_marker: "Dan".into(),
            person_key: "Korisnik".into(),
            metadata_keys: metadata_keys.iter().map(|k| k.to_string()).collect(),
            skip_labels: ["Statistika", "Vrijeme", "Ukupno", "Vremenski razrez"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            blank_label_rows: BlankLabelRows::Skip,
        }
    }
}

/// What to do with timeclock rows whose first cell is blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankLabelRows {
    /// Ignore them.
    #[default]
    Skip,
    /// Treat them as detail rows of the current section.
    Detail,
}

// ---------------------------------------------------------------------------
// Travel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TravelConfig {
    pub header_row: usize,
    pub order_column: String,
    pub name_column: String,
    pub reason_column: String,
    pub departure_column: String,
    pub return_column: String,
    /// Order-number value marking the grand-total footer row.
    pub total_sentinel: String,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            header_row: 3,
            order_column: "Broj PN".into(),
            name_column: "Prezime i ime".into(),
            reason_column: "Zadatak službenog puta".into(),
            departure_column: "Dat. Polaska".into(),
            return_column: "Dat. Povratka".into(),
            total_sentinel: "SVEUKUPNO".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifyConfig {
    pub absence_label: String,
    pub weekend_label: String,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            absence_label: "Odsutan".into(),
            weekend_label: "Vikend".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML (used to print the effective config).
    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for (field, row) in [
            ("roster.header_row", self.roster.header_row),
            ("travel.header_row", self.travel.header_row),
        ] {
            if row > MAX_HEADER_ROW {
                return Err(ReconError::ConfigValidation(format!(
                    "{field} must be at most {MAX_HEADER_ROW}, got {row}"
                )));
            }
        }

        if self.roster.max_id == 0 {
            return Err(ReconError::ConfigValidation(
                "roster.max_id must be at least 1".into(),
            ));
        }
        self.roster.placeholder_regex()?;

        let required = [
            ("roster.id_column", &self.roster.id_column),
            ("roster.name_column", &self.roster.name_column),
            ("timeclock.section_marker", &self.timeclock.section_marker),
            ("timeclock.person_key", &self.timeclock.person_key),
            ("travel.order_column", &self.travel.order_column),
            ("travel.name_column", &self.travel.name_column),
            ("travel.reason_column", &self.travel.reason_column),
            ("travel.departure_column", &self.travel.departure_column),
            ("travel.return_column", &self.travel.return_column),
            ("travel.total_sentinel", &self.travel.total_sentinel),
            ("classify.absence_label", &self.classify.absence_label),
            ("classify.weekend_label", &self.classify.weekend_label),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{field} must not be empty")));
            }
        }

        let tc = &self.timeclock;
        if !tc.metadata_keys.contains(&tc.person_key) {
            return Err(ReconError::ConfigValidation(format!(
                "timeclock.person_key '{}' is not one of timeclock.metadata_keys",
                tc.person_key
            )));
        }
        if tc.metadata_keys.contains(&tc.section_marker) || tc.skip_labels.contains(&tc.section_marker) {
            return Err(ReconError::ConfigValidation(format!(
                "timeclock.section_marker '{}' is also listed as a metadata key or skip label",
                tc.section_marker
            )));
        }
        if let Some(key) = tc.metadata_keys.iter().find(|k| tc.skip_labels.contains(k)) {
            return Err(ReconError::ConfigValidation(format!(
                "'{key}' is listed both as a metadata key and a skip label"
            )));
        }

        if self.classify.absence_label == self.classify.weekend_label {
            return Err(ReconError::ConfigValidation(
                "classify.absence_label and classify.weekend_label must differ".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config, ReconConfig::default());
        assert_eq!(config.roster.header_row, 3);
        assert_eq!(config.roster.max_id, 1000);
        assert_eq!(config.timeclock.metadata_keys.len(), 17);
        assert_eq!(config.timeclock.blank_label_rows, BlankLabelRows::Skip);
        assert_eq!(config.travel.total_sentinel, "SVEUKUPNO");
        assert!(config.period.is_none());
    }

    #[test]
    fn parse_partial_overrides() {
        let input = r#"
[roster]
header_row = 0
max_id = 50

[timeclock]
blank_label_rows = "detail"

[period]
year = 2024
month = 3
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        assert_eq!(config.roster.header_row, 0);
        assert_eq!(config.roster.max_id, 50);
        // untouched fields keep their defaults
        assert_eq!(config.roster.name_column, "PREZIME i IME");
        assert_eq!(config.timeclock.blank_label_rows, BlankLabelRows::Detail);
        assert_eq!(config.period, Period::new(2024, 3));
    }

    #[test]
    fn parse_rejects_unknown_field() {
        let err = ReconConfig::from_toml("[roster]\nheadr_row = 2\n");
        assert!(matches!(err, Err(ReconError::ConfigParse(_))), "typo in key should fail");
    }

    #[test]
    fn parse_rejects_invalid_blank_policy() {
        let err = ReconConfig::from_toml("[timeclock]\nblank_label_rows = \"keep\"\n");
        assert!(matches!(err, Err(ReconError::ConfigParse(_))));
    }

    #[test]
    fn reject_bad_period_month() {
        let err = ReconConfig::from_toml("[period]\nyear = 2024\nmonth = 13\n");
        assert!(err.is_err());
    }

    #[test]
    fn reject_bad_placeholder_regex() {
        let err = ReconConfig::from_toml("[roster]\nplaceholder_pattern = \"(\"\n");
        match err {
            Err(ReconError::ConfigValidation(msg)) => assert!(msg.contains("placeholder_pattern")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn reject_empty_label() {
        let err = ReconConfig::from_toml("[classify]\nabsence_label = \" \"\n");
        assert!(matches!(err, Err(ReconError::ConfigValidation(_))));
    }

    #[test]
    fn reject_person_key_outside_metadata() {
        let err = ReconConfig::from_toml("[timeclock]\nperson_key = \"Ime\"\n");
        match err {
            Err(ReconError::ConfigValidation(msg)) => assert!(msg.contains("person_key")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn reject_marker_in_skip_labels() {
        let input = "[timeclock]\nsection_marker = \"Ukupno\"\n";
        assert!(matches!(
            ReconConfig::from_toml(input),
            Err(ReconError::ConfigValidation(_))
        ));
    }

    #[test]
    fn reject_same_absence_and_weekend_label() {
        let input = "[classify]\nabsence_label = \"X\"\nweekend_label = \"X\"\n";
        assert!(ReconConfig::from_toml(input).is_err());
    }

    #[test]
    fn reject_zero_max_id() {
        assert!(ReconConfig::from_toml("[roster]\nmax_id = 0\n").is_err());
    }

    #[test]
    fn toml_render_reparses() {
        let config = ReconConfig {
            period: Period::new(2024, 2),
            ..ReconConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("[roster]"));
        assert_eq!(ReconConfig::from_toml(&text).unwrap(), config);
    }
}
