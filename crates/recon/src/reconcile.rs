// Three-way join on (normalized name, date) and discrepancy classification.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::ClassifyConfig;
use crate::model::{
    normalize_name, DatedRosterFact, DiscrepancyKind, ReconciledRow, TimeclockFact, TravelFact,
};

type JoinKey = (String, NaiveDate);

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Every row of the full join, ordered by (normalized name, date).
    pub joined: Vec<ReconciledRow>,
    /// One row per contributing roster or travel-only fact, with the first
    /// status of its (normalized name, date) group.
    pub rows: Vec<ReconciledRow>,
    /// Upper bound for both reports; `None` when the timeclock carries no dates.
    pub max_date: Option<NaiveDate>,
}

impl Reconciliation {
    pub fn report(&self, kind: DiscrepancyKind, labels: &ClassifyConfig) -> Vec<ReconciledRow> {
        classify(&self.rows, kind, self.max_date, labels)
    }
}

/// The fact a joined row was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Roster(usize),
    Travel(usize),
}

#[derive(Debug, Clone)]
struct Joined {
    origin: Origin,
    row: ReconciledRow,
}

pub fn reconcile(
    roster: &[DatedRosterFact],
    timeclock: &[TimeclockFact],
    travel: &[TravelFact],
) -> Reconciliation {
    let joined = join_tagged(roster, timeclock, travel);
    let rows = collapse(&joined);
    let max_date = timeclock.iter().filter_map(|f| f.date).max();
    tracing::info!(joined = joined.len(), rows = rows.len(), ?max_date, "sources reconciled");
    Reconciliation {
        joined: joined.into_iter().map(|j| j.row).collect(),
        rows,
        max_date,
    }
}

/// Roster left-joined with the timeclock, then fully outer-joined with
/// travel. Rows come out ordered by (normalized name, date); the sort is
/// stable, so rows sharing a key keep roster-then-timeclock order.
pub fn join(
    roster: &[DatedRosterFact],
    timeclock: &[TimeclockFact],
    travel: &[TravelFact],
) -> Vec<ReconciledRow> {
    join_tagged(roster, timeclock, travel)
        .into_iter()
        .map(|j| j.row)
        .collect()
}

fn join_tagged(
    roster: &[DatedRosterFact],
    timeclock: &[TimeclockFact],
    travel: &[TravelFact],
) -> Vec<Joined> {
    let mut clock_index: HashMap<JoinKey, Vec<&TimeclockFact>> = HashMap::new();
    for fact in timeclock {
        if let (Some(name), Some(date)) = (&fact.employee_name, fact.date) {
            clock_index.entry((normalize_name(name), date)).or_default().push(fact);
        }
    }

    let mut with_clock = Vec::with_capacity(roster.len());
    for (i, dated) in roster.iter().enumerate() {
        let row = ReconciledRow {
            employee_name: dated.fact.name.clone(),
            key: normalize_name(&dated.fact.name),
            date: dated.date,
            travel_reason: None,
            attendance: Some(dated.fact.value.clone()),
            status_label: None,
        };
        let origin = Origin::Roster(i);
        match clock_index.get(&(row.key.clone(), row.date)) {
            Some(matches) => with_clock.extend(matches.iter().map(|m| Joined {
                origin,
                row: ReconciledRow {
                    status_label: m.status_label.clone(),
                    ..row.clone()
                },
            })),
            None => with_clock.push(Joined { origin, row }),
        }
    }

    let mut travel_index: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (i, fact) in travel.iter().enumerate() {
        travel_index
            .entry((normalize_name(&fact.employee_name), fact.date))
            .or_default()
            .push(i);
    }

    let mut matched = vec![false; travel.len()];
    let mut rows = Vec::with_capacity(with_clock.len());
    for joined in with_clock {
        match travel_index.get(&(joined.row.key.clone(), joined.row.date)) {
            Some(hits) => {
                for &i in hits {
                    matched[i] = true;
                    rows.push(Joined {
                        origin: joined.origin,
                        row: ReconciledRow {
                            travel_reason: travel[i].reason.clone(),
                            ..joined.row.clone()
                        },
                    });
                }
            }
            None => rows.push(joined),
        }
    }
    for (i, fact) in travel.iter().enumerate().filter(|(i, _)| !matched[*i]) {
        rows.push(Joined {
            origin: Origin::Travel(i),
            row: ReconciledRow {
                employee_name: fact.employee_name.clone(),
                key: normalize_name(&fact.employee_name),
                date: fact.date,
                travel_reason: fact.reason.clone(),
                attendance: None,
                status_label: None,
            },
        });
    }

    rows.sort_by(|a, b| a.row.key.cmp(&b.row.key).then(a.row.date.cmp(&b.row.date)));
    rows
}

/// Folds each (normalized name, date) group to one row per origin fact.
/// Every folded row carries the group's first present status; the travel
/// reason is the first present one among that fact's rows.
/// Expects `joined` ordered by key, as [`join_tagged`] returns it.
fn collapse(joined: &[Joined]) -> Vec<ReconciledRow> {
    let mut out = Vec::new();
    for group in joined.chunk_by(|a, b| a.row.key == b.row.key && a.row.date == b.row.date) {
        let status = group.iter().find_map(|j| j.row.status_label.clone());
        let mut folded: Vec<(Origin, ReconciledRow)> = Vec::new();
        for j in group {
            match folded.iter_mut().find(|(origin, _)| *origin == j.origin) {
                Some((_, row)) => {
                    if row.travel_reason.is_none() {
                        row.travel_reason = j.row.travel_reason.clone();
                    }
                }
                None => folded.push((
                    j.origin,
                    ReconciledRow {
                        status_label: status.clone(),
                        ..j.row.clone()
                    },
                )),
            }
        }
        out.extend(folded.into_iter().map(|(_, row)| row));
    }
    out
}

pub fn classify(
    rows: &[ReconciledRow],
    kind: DiscrepancyKind,
    max_date: Option<NaiveDate>,
    labels: &ClassifyConfig,
) -> Vec<ReconciledRow> {
    let Some(max_date) = max_date else {
        return Vec::new();
    };
    rows.iter()
        .filter(|row| row.date <= max_date && is_flagged(row, kind, labels))
        .cloned()
        .collect()
}

fn is_flagged(row: &ReconciledRow, kind: DiscrepancyKind, labels: &ClassifyConfig) -> bool {
    match kind {
        DiscrepancyKind::UnexplainedAbsence => {
            let absent = row
                .status_label
                .as_deref()
                .map_or(true, |s| s == labels.absence_label);
            absent && row.travel_reason.is_none() && row.is_numeric()
        }
        DiscrepancyKind::UnexplainedNonNumeric => {
            let working = row
                .status_label
                .as_deref()
                .is_some_and(|s| s != labels.absence_label && s != labels.weekend_label);
            working && !row.is_numeric()
        }
    }
}
