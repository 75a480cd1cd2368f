// One run of the engine: parse the requested sources, resolve dates,
// reconcile, and build every requested table. Failures are per artifact.

use std::collections::BTreeSet;
use std::fmt;
use std::thread::{self, ScopedJoinHandle};

use provjera_core::{RawSheet, Table};

use crate::config::ReconConfig;
use crate::dates::{self, Period};
use crate::error::ReconError;
use crate::model::{DiscrepancyKind, SourceKind};
use crate::reconcile::{self, Reconciliation};
use crate::roster::{self, RosterParse};
use crate::summary::{ArtifactSummary, ReconSummary};
use crate::tables;
use crate::timeclock::{self, TimeclockParse};
use crate::travel::{self, TravelParse};

// ---------------------------------------------------------------------------
// Inputs + requests
// ---------------------------------------------------------------------------

/// Raw sheets for one run. Any may be absent when no requested artifact needs it.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub roster: Option<RawSheet>,
    pub timeclock: Option<RawSheet>,
    pub travel: Option<RawSheet>,
}

/// Everything the pipeline can produce, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Artifact {
    Roster,
    Timeclock,
    Travel,
    Merged,
    Report(DiscrepancyKind),
}

impl Artifact {
    pub const ALL: [Artifact; 6] = [
        Artifact::Roster,
        Artifact::Timeclock,
        Artifact::Travel,
        Artifact::Merged,
        Artifact::Report(DiscrepancyKind::UnexplainedAbsence),
        Artifact::Report(DiscrepancyKind::UnexplainedNonNumeric),
    ];

    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::Roster => tables::ROSTER_SHEET,
            Self::Timeclock => tables::TIMECLOCK_SHEET,
            Self::Travel => tables::TRAVEL_SHEET,
            Self::Merged => tables::MERGED_SHEET,
            Self::Report(kind) => tables::report_sheet(*kind),
        }
    }

    /// File name used when each artifact is written to its own workbook.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Roster => "transformed_masterteam.xlsx",
            Self::Timeclock => "transformed_jantar.xlsx",
            Self::Travel => "processed_pn_data.xlsx",
            Self::Merged => "merged_report.xlsx",
            Self::Report(DiscrepancyKind::UnexplainedAbsence) => "1_odsutni_prema_jantaru.xlsx",
            Self::Report(DiscrepancyKind::UnexplainedNonNumeric) => "1_odsutni_prema_masterteam.xlsx",
        }
    }

    pub fn is_report(&self) -> bool {
        matches!(self, Self::Report(_))
    }

    fn needs(&self, kind: SourceKind) -> bool {
        match self {
            Self::Roster => kind == SourceKind::Roster,
            Self::Timeclock => kind == SourceKind::Timeclock,
            Self::Travel => kind == SourceKind::Travel,
            Self::Merged | Self::Report(_) => true,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Roster => write!(f, "roster"),
            Self::Timeclock => write!(f, "timeclock"),
            Self::Travel => write!(f, "travel"),
            Self::Merged => write!(f, "merged"),
            Self::Report(kind) => write!(f, "{kind}"),
        }
    }
}

/// Which artifacts a run should build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    artifacts: BTreeSet<Artifact>,
}

impl OutputRequest {
    pub fn all() -> Self {
        Self::only(Artifact::ALL)
    }

    pub fn only(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        Self {
            artifacts: artifacts.into_iter().collect(),
        }
    }

    /// The merged report and both discrepancy reports.
    pub fn reconciliation() -> Self {
        Self::only(Artifact::ALL.into_iter().filter(|a| matches!(a, Artifact::Merged | Artifact::Report(_))))
    }

    pub fn contains(&self, artifact: Artifact) -> bool {
        self.artifacts.contains(&artifact)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.artifacts.iter().copied()
    }

    pub fn needs(&self, kind: SourceKind) -> bool {
        self.artifacts.iter().any(|a| a.needs(kind))
    }

    fn needs_reconciliation(&self) -> bool {
        self.artifacts.iter().any(|a| matches!(a, Artifact::Merged | Artifact::Report(_)))
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ArtifactOutput {
    pub artifact: Artifact,
    pub result: Result<Table, ReconError>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub artifacts: Vec<ArtifactOutput>,
    pub summary: ReconSummary,
}

impl PipelineOutput {
    pub fn table(&self, artifact: Artifact) -> Option<&Table> {
        self.artifacts
            .iter()
            .find(|a| a.artifact == artifact)
            .and_then(|a| a.result.as_ref().ok())
    }

    /// Successfully built tables, in artifact order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.artifacts.iter().filter_map(|a| a.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (Artifact, &ReconError)> {
        self.artifacts
            .iter()
            .filter_map(|a| a.result.as_ref().err().map(|e| (a.artifact, e)))
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

type Parsed<T> = Option<Result<T, ReconError>>;

pub struct Pipeline {
    config: ReconConfig,
}

impl Pipeline {
    pub fn new(config: ReconConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn run(&self, sources: &Sources, request: &OutputRequest) -> PipelineOutput {
        let config = &self.config;

        // The parsers share nothing, so each gets its own thread.
        let (roster, timeclock, travel) = thread::scope(|s| {
            let roster = s.spawn(|| {
                request.needs(SourceKind::Roster).then(|| {
                    let sheet = required(&sources.roster, SourceKind::Roster)?;
                    roster::parse_roster(sheet, &config.roster)
                })
            });
            let timeclock = s.spawn(|| {
                request.needs(SourceKind::Timeclock).then(|| {
                    let sheet = required(&sources.timeclock, SourceKind::Timeclock)?;
                    Ok::<_, ReconError>(timeclock::parse_timeclock(sheet, &config.timeclock))
                })
            });
            let travel = s.spawn(|| {
                request.needs(SourceKind::Travel).then(|| {
                    let sheet = required(&sources.travel, SourceKind::Travel)?;
                    travel::expand_travel_orders(sheet, &config.travel)
                })
            });
            (join_parser(roster), join_parser(timeclock), join_parser(travel))
        });

        let mut summary = ReconSummary::new();
        if let Some(Ok(p)) = &roster {
            summary.record_source(SourceKind::Roster, p.facts.len(), p.dropped_rows);
        }
        if let Some(Ok(p)) = &timeclock {
            summary.record_source(SourceKind::Timeclock, p.facts.len(), p.dropped_rows);
        }
        if let Some(Ok(p)) = &travel {
            summary.record_source(SourceKind::Travel, p.facts.len(), p.dropped_rows);
        }

        let reconciliation = request
            .needs_reconciliation()
            .then(|| self.reconcile(&roster, &timeclock, &travel));
        if let Some(Ok((period, rec))) = &reconciliation {
            summary.set_period(*period, rec.max_date);
        }

        let mut artifacts = Vec::new();
        for artifact in request.artifacts() {
            let result = match artifact {
                Artifact::Roster => {
                    parsed(&roster, SourceKind::Roster).map(|p| tables::roster_table(&p.facts, &config.roster))
                }
                Artifact::Timeclock => parsed(&timeclock, SourceKind::Timeclock)
                    .map(|p| tables::timeclock_table(&p.facts, &config.timeclock)),
                Artifact::Travel => parsed(&travel, SourceKind::Travel).map(|p| tables::travel_table(&p.facts)),
                Artifact::Merged | Artifact::Report(_) => match &reconciliation {
                    Some(Ok((_, rec))) => Ok(self.reconciled_table(artifact, rec)),
                    Some(Err(e)) => Err(e.clone()),
                    None => Err(ReconError::MissingInput(SourceKind::Roster)),
                },
            };

            match &result {
                Ok(table) => tracing::info!(%artifact, rows = table.len(), "artifact built"),
                Err(e) => tracing::warn!(%artifact, error = %e, "artifact failed"),
            }
            summary.record_artifact(ArtifactSummary {
                artifact: artifact.to_string(),
                sheet: artifact.sheet_name().to_string(),
                rows: result.as_ref().ok().map(Table::len),
                error: result.as_ref().err().map(ToString::to_string),
                report: artifact.is_report(),
            });
            artifacts.push(ArtifactOutput { artifact, result });
        }

        PipelineOutput { artifacts, summary }
    }

    fn reconcile(
        &self,
        roster: &Parsed<RosterParse>,
        timeclock: &Parsed<TimeclockParse>,
        travel: &Parsed<TravelParse>,
    ) -> Result<(Period, Reconciliation), ReconError> {
        let roster = parsed(roster, SourceKind::Roster)?;
        let timeclock = parsed(timeclock, SourceKind::Timeclock)?;
        let travel = parsed(travel, SourceKind::Travel)?;

        let period = match self.config.period {
            Some(period) => {
                tracing::info!(%period, "reporting period fixed by config");
                period
            }
            None => dates::resolve_period(&timeclock.facts)?,
        };
        let dated = dates::date_roster(&roster.facts, period)?;
        Ok((period, reconcile::reconcile(&dated, &timeclock.facts, &travel.facts)))
    }

    fn reconciled_table(&self, artifact: Artifact, rec: &Reconciliation) -> Table {
        match artifact {
            Artifact::Report(kind) => {
                let rows = rec.report(kind, &self.config.classify);
                if rows.is_empty() {
                    tracing::info!(report = %kind, "nothing to flag");
                }
                tables::reconciled_table(artifact.sheet_name(), &rows)
            }
            _ => tables::reconciled_table(artifact.sheet_name(), &rec.joined),
        }
    }
}

fn required(sheet: &Option<RawSheet>, kind: SourceKind) -> Result<&RawSheet, ReconError> {
    sheet.as_ref().ok_or(ReconError::MissingInput(kind))
}

fn parsed<T>(result: &Parsed<T>, kind: SourceKind) -> Result<&T, ReconError> {
    match result {
        Some(Ok(p)) => Ok(p),
        Some(Err(e)) => Err(e.clone()),
        None => Err(ReconError::MissingInput(kind)),
    }
}

fn join_parser<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
