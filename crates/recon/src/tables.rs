// Output tables: tidy per-source exports, the merged report and the two
// discrepancy reports. Sheet names and headers are part of the output contract.

use provjera_core::{Cell, Table};

use crate::config::{RosterConfig, TimeclockConfig};
use crate::model::{
    DiscrepancyKind, ReconciledRow, RosterFact, TimeclockFact, TravelFact, DATE_SLOT, DETAIL_COLUMNS,
};

pub const ROSTER_SHEET: &str = "MasterTeam";
pub const TIMECLOCK_SHEET: &str = "Jantar";
pub const TRAVEL_SHEET: &str = "Processed Data";
pub const MERGED_SHEET: &str = "Merged Report";

pub const TRAVEL_COLUMNS: [&str; 3] = ["Prezime Ime", "Datum", "Razlog odsutnosti"];
pub const REPORT_COLUMNS: [&str; 5] = [
    "PREZIME i IME",
    "Full_Date",
    "Razlog odsutnosti",
    "Value",
    "Statistika",
];

pub fn report_sheet(kind: DiscrepancyKind) -> &'static str {
    match kind {
        DiscrepancyKind::UnexplainedAbsence => "1. Odsutni prema Jantaru",
        DiscrepancyKind::UnexplainedNonNumeric => "1. Odsutni prema MasterTeam",
    }
}

/// `Rbr, PREZIME i IME, Day, Value`, column names following the roster config.
pub fn roster_table(facts: &[RosterFact], config: &RosterConfig) -> Table {
    let mut table = Table::new(
        ROSTER_SHEET,
        [config.id_column.as_str(), config.name_column.as_str(), "Day", "Value"],
    );
    for fact in facts {
        table.push_row(vec![
            Cell::Number(f64::from(fact.employee_id)),
            Cell::text(fact.name.clone()),
            Cell::Number(f64::from(fact.day)),
            fact.value.to_cell(),
        ]);
    }
    table
}

/// Metadata keys in first-seen order across all sections, then the eight
/// detail slots. The person key holds the normalized employee name and the
/// date slot its forward-filled value.
pub fn timeclock_table(facts: &[TimeclockFact], config: &TimeclockConfig) -> Table {
    let mut keys: Vec<&str> = Vec::new();
    for fact in facts {
        for key in fact.metadata.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut table = Table::new(TIMECLOCK_SHEET, keys.iter().copied().chain(DETAIL_COLUMNS));
    for fact in facts {
        let mut row: Vec<Cell> = keys
            .iter()
            .map(|key| {
                if *key == config.person_key {
                    Cell::from(fact.employee_name.clone())
                } else {
                    fact.metadata.get(key).cloned().unwrap_or_default()
                }
            })
            .collect();
        let mut fields = fact.fields.clone();
        fields[DATE_SLOT] = fact.date_cell.clone();
        row.extend(fields);
        table.push_row(row);
    }
    table
}

pub fn travel_table(facts: &[TravelFact]) -> Table {
    let mut table = Table::new(TRAVEL_SHEET, TRAVEL_COLUMNS);
    for fact in facts {
        table.push_row(vec![
            Cell::text(fact.employee_name.clone()),
            Cell::text(fact.date.format("%d.%m.%Y").to_string()),
            Cell::from(fact.reason.clone()),
        ]);
    }
    table
}

pub fn reconciled_table(name: &str, rows: &[ReconciledRow]) -> Table {
    let mut table = Table::new(name, REPORT_COLUMNS);
    for row in rows {
        table.push_row(vec![
            Cell::text(row.employee_name.clone()),
            Cell::Date(row.date),
            Cell::from(row.travel_reason.clone()),
            row.attendance.as_ref().map(|v| v.to_cell()).unwrap_or_default(),
            Cell::from(row.status_label.clone()),
        ]);
    }
    table
}
