use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::Period;
use crate::model::SourceKind;

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    /// Reporting month, once resolved.
    pub period: Option<String>,
    pub max_timeclock_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSummary {
    pub facts: usize,
    pub dropped_rows: usize,
    /// Content hash of the input file, when the caller supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub artifact: String,
    pub sheet: String,
    /// Row count; `None` when the artifact failed.
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Discrepancy reports only.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub report: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub meta: ReconMeta,
    pub sources: BTreeMap<SourceKind, SourceSummary>,
    pub artifacts: Vec<ArtifactSummary>,
    /// Total rows across the discrepancy reports.
    pub discrepancies: usize,
}

impl ReconSummary {
    pub fn new() -> Self {
        Self {
            meta: ReconMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                period: None,
                max_timeclock_date: None,
            },
            sources: BTreeMap::new(),
            artifacts: Vec::new(),
            discrepancies: 0,
        }
    }

    pub fn set_period(&mut self, period: Period, max_timeclock_date: Option<NaiveDate>) {
        self.meta.period = Some(period.to_string());
        self.meta.max_timeclock_date = max_timeclock_date;
    }

    pub fn record_source(&mut self, kind: SourceKind, facts: usize, dropped_rows: usize) {
        let entry = self.sources.entry(kind).or_default();
        entry.facts = facts;
        entry.dropped_rows = dropped_rows;
    }

    pub fn set_fingerprint(&mut self, kind: SourceKind, fingerprint: String) {
        self.sources.entry(kind).or_default().fingerprint = Some(fingerprint);
    }

    pub fn record_artifact(&mut self, artifact: ArtifactSummary) {
        if artifact.report {
            self.discrepancies += artifact.rows.unwrap_or(0);
        }
        self.artifacts.push(artifact);
    }

    pub fn failed(&self) -> usize {
        self.artifacts.iter().filter(|a| a.error.is_some()).count()
    }
}

impl Default for ReconSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str, rows: Option<usize>, report: bool) -> ArtifactSummary {
        ArtifactSummary {
            artifact: name.into(),
            sheet: name.into(),
            rows,
            error: rows.is_none().then(|| "boom".to_string()),
            report,
        }
    }

    #[test]
    fn summary_counts() {
        let mut summary = ReconSummary::new();
        summary.record_source(SourceKind::Roster, 62, 3);
        summary.set_fingerprint(SourceKind::Roster, "abc".into());
        summary.record_artifact(artifact("merged", Some(70), false));
        summary.record_artifact(artifact("unexplained_absence", Some(4), true));
        summary.record_artifact(artifact("unexplained_non_numeric", Some(2), true));
        summary.record_artifact(artifact("travel", None, false));

        assert_eq!(summary.discrepancies, 6);
        assert_eq!(summary.failed(), 1);
        let roster = &summary.sources[&SourceKind::Roster];
        assert_eq!(roster.facts, 62);
        assert_eq!(roster.dropped_rows, 3);
        assert_eq!(roster.fingerprint.as_deref(), Some("abc"));
    }

    #[test]
    fn summary_json_shape() {
        let mut summary = ReconSummary::new();
        summary.set_period(Period::new(2024, 3).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 15));
        summary.record_source(SourceKind::Timeclock, 10, 0);
        summary.record_artifact(artifact("merged", Some(1), false));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["meta"]["period"], "2024-03");
        assert_eq!(json["meta"]["max_timeclock_date"], "2024-03-15");
        assert_eq!(json["sources"]["timeclock"]["facts"], 10);
        assert!(json["sources"]["timeclock"].get("fingerprint").is_none());
        assert!(json["artifacts"][0].get("report").is_none());
        assert!(json["artifacts"][0].get("error").is_none());
    }
}
