// MasterTeam roster: wide grid (one row per employee, one column per day)
// unpivoted into one fact per employee-day.

use provjera_core::{Cell, RawSheet};

use crate::config::RosterConfig;
use crate::error::ReconError;
use crate::model::{AttendanceValue, RosterFact, SourceKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterParse {
    pub facts: Vec<RosterFact>,
    /// Employee rows kept after id filtering.
    pub employees: usize,
    /// Non-blank data rows dropped for a missing, non-integral or out-of-range id.
    pub dropped_rows: usize,
    /// Day number of every unpivoted column, in sheet order.
    pub days: Vec<u32>,
}

struct Employee {
    id: u32,
    name: String,
    row: usize,
}

pub fn parse_roster(sheet: &RawSheet, config: &RosterConfig) -> Result<RosterParse, ReconError> {
    let placeholder = config.placeholder_regex()?;
    let header_row = config.header_row;
    if sheet.height() <= header_row {
        tracing::warn!(sheet = %sheet.name, header_row, "roster sheet has no header row");
        return Ok(RosterParse::default());
    }

    // Column 0 is the sheet's own index column and never carries data.
    let headers: Vec<(usize, String)> = (1..sheet.width())
        .map(|col| (col, header_text(sheet.cell(header_row, col))))
        .collect();

    let find = |name: &str| headers.iter().find(|(_, h)| h == name.trim()).map(|(c, _)| *c);
    let Some(id_col) = find(&config.id_column) else {
        tracing::warn!(column = %config.id_column, "roster id column not found; no facts");
        return Ok(RosterParse::default());
    };
    let name_col = find(&config.name_column).ok_or_else(|| ReconError::MissingColumn {
        input: SourceKind::Roster,
        column: config.name_column.clone(),
    })?;

    let mut day_columns: Vec<(usize, u32)> = Vec::new();
    for (col, header) in &headers {
        if *col == id_col || *col == name_col || header.is_empty() || placeholder.is_match(header) {
            continue;
        }
        match day_number(header) {
            Some(day) if (1..=31).contains(&day) => day_columns.push((*col, day)),
            Some(day) => tracing::debug!(header = %header, day, "day number out of range; column skipped"),
            None => {}
        }
    }

    let mut employees = Vec::new();
    let mut dropped_rows = 0;
    for row in header_row + 1..sheet.height() {
        let cells = sheet.row(row);
        if cells.iter().all(Cell::is_blank) {
            continue;
        }
        match employee_id(sheet.cell(row, id_col), config.max_id) {
            Some(id) => employees.push(Employee {
                id,
                name: sheet.cell(row, name_col).to_string(),
                row,
            }),
            None => {
                tracing::debug!(row, value = %sheet.cell(row, id_col), "roster row dropped");
                dropped_rows += 1;
            }
        }
    }

    // Column-major: every employee for the first day, then the next day.
    let mut facts = Vec::with_capacity(day_columns.len() * employees.len());
    for &(col, day) in &day_columns {
        for employee in &employees {
            facts.push(RosterFact {
                employee_id: employee.id,
                name: employee.name.clone(),
                day,
                value: AttendanceValue::from_cell(sheet.cell(employee.row, col)),
            });
        }
    }

    tracing::info!(
        employees = employees.len(),
        days = day_columns.len(),
        facts = facts.len(),
        dropped_rows,
        "roster parsed"
    );

    Ok(RosterParse {
        facts,
        employees: employees.len(),
        dropped_rows,
        days: day_columns.into_iter().map(|(_, day)| day).collect(),
    })
}

fn header_text(cell: &Cell) -> String {
    cell.to_string().trim().to_string()
}

/// Integral id in `1..=max_id`, or `None` for footer/signature rows.
fn employee_id(cell: &Cell, max_id: u32) -> Option<u32> {
    let n = cell.as_number()?;
    if n.fract() != 0.0 || n < 1.0 || n > f64::from(max_id) {
        return None;
    }
    Some(n as u32)
}

/// First run of ASCII digits in a header ("Po 12" -> 12).
fn day_number(header: &str) -> Option<u32> {
    let start = header.find(|c: char| c.is_ascii_digit())?;
    let digits: String = header[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn t(s: &str) -> Cell {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::text(s)
        }
    }

    /// Three banner rows, header on row 3, like the MasterTeam export.
    fn sheet(header: &[&str], rows: &[&[&str]]) -> RawSheet {
        let mut grid = vec![
            vec![t("EVIDENCIJA PRISUTNOSTI")],
            vec![],
            vec![t("Ožujak 2024")],
            header.iter().map(|s| t(s)).collect(),
        ];
        grid.extend(rows.iter().map(|r| r.iter().map(|s| t(s)).collect()));
        RawSheet::new("MasterTeam", grid)
    }

    fn header() -> Vec<&'static str> {
        vec!["", "Rbr", "PREZIME i IME", "Unnamed: 3", "Pe 1", "Su 2", "Ne 3"]
    }

    #[test]
    fn unpivots_column_major() {
        let s = sheet(
            &header(),
            &[
                &["a", "1", "Anić Ana", "x", "8", "", "Vikend"],
                &["b", "2", "Babić Ivo", "x", "GO", "8", ""],
            ],
        );
        let parsed = parse_roster(&s, &RosterConfig::default()).unwrap();
        assert_eq!(parsed.days, vec![1, 2, 3]);
        assert_eq!(parsed.employees, 2);
        assert_eq!(parsed.facts.len(), 6);

        let order: Vec<(u32, u32)> = parsed.facts.iter().map(|f| (f.day, f.employee_id)).collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1), (2, 2), (3, 1), (3, 2)]);

        assert_eq!(parsed.facts[0].value, AttendanceValue::Numeric(8.0));
        assert_eq!(parsed.facts[1].value, AttendanceValue::Code("GO".into()));
        assert_eq!(parsed.facts[2].value, AttendanceValue::Empty);
        assert_eq!(parsed.facts[4].value, AttendanceValue::Code("Vikend".into()));
        assert_eq!(parsed.facts[1].name, "Babić Ivo");
    }

    #[test]
    fn drops_summary_and_footer_rows() {
        let s = sheet(
            &header(),
            &[
                &["", "1", "Anić Ana", "", "8", "8", "8"],
                &["", "1.5", "Pola", "", "8", "8", "8"],
                &["", "0", "Nula", "", "8", "8", "8"],
                &["", "1001", "UKUPNO", "", "160", "160", "160"],
                &["", "Potpis:", "", "", "", "", ""],
                &[],
            ],
        );
        let parsed = parse_roster(&s, &RosterConfig::default()).unwrap();
        assert_eq!(parsed.employees, 1);
        assert_eq!(parsed.dropped_rows, 4);
        assert!(parsed.facts.iter().all(|f| (1..=1000).contains(&f.employee_id)));
        assert!(parsed.facts.iter().all(|f| (1..=31).contains(&f.day)));
    }

    #[test]
    fn skips_placeholder_and_out_of_range_columns() {
        let s = sheet(
            &["", "Rbr", "PREZIME i IME", "Unnamed: 3", "Ukupno 40", "Napomena", "Dan 15"],
            &[&["", "1", "Ana", "7", "99", "n", "8"]],
        );
        let parsed = parse_roster(&s, &RosterConfig::default()).unwrap();
        assert_eq!(parsed.days, vec![15]);
        assert_eq!(parsed.facts.len(), 1);
    }

    #[test]
    fn missing_or_non_numeric_id_yields_empty() {
        let no_id = sheet(&["", "Broj", "PREZIME i IME", "1"], &[&["", "1", "Ana", "8"]]);
        assert!(parse_roster(&no_id, &RosterConfig::default()).unwrap().facts.is_empty());

        let text_ids = sheet(&["", "Rbr", "PREZIME i IME", "1"], &[&["", "prvi", "Ana", "8"]]);
        let parsed = parse_roster(&text_ids, &RosterConfig::default()).unwrap();
        assert!(parsed.facts.is_empty());
        assert_eq!(parsed.dropped_rows, 1);
    }

    #[test]
    fn empty_sheet_yields_empty() {
        let empty = RawSheet::new("MasterTeam", vec![]);
        assert_eq!(parse_roster(&empty, &RosterConfig::default()).unwrap(), RosterParse::default());
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let s = sheet(&["", "Rbr", "Ime", "1"], &[&["", "1", "Ana", "8"]]);
        let err = parse_roster(&s, &RosterConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ReconError::MissingColumn {
                input: SourceKind::Roster,
                column: "PREZIME i IME".into()
            }
        );
    }

    #[test]
    fn numeric_ids_and_headers_from_spreadsheets() {
        let grid = vec![
            vec![],
            vec![],
            vec![],
            vec![Cell::Empty, t("Rbr"), t("PREZIME i IME"), Cell::Number(1.0), Cell::Number(2.0)],
            vec![Cell::Empty, Cell::Number(3.0), t("Ana"), Cell::Number(7.5), t(" bo ")],
        ];
        let parsed = parse_roster(&RawSheet::new("x", grid), &RosterConfig::default()).unwrap();
        assert_eq!(parsed.days, vec![1, 2]);
        assert_eq!(parsed.facts[0].employee_id, 3);
        assert_eq!(parsed.facts[0].value, AttendanceValue::Numeric(7.5));
        assert_eq!(parsed.facts[1].value, AttendanceValue::Code("bo".into()));
    }

    #[test]
    fn repivot_reproduces_grid() {
        let rows: &[&[&str]] = &[
            &["", "1", "Anić Ana", "", "8", "GO", ""],
            &["", "2", "Babić Ivo", "", "", "8", "7.5"],
            &["", "3", "Car Eva", "", "BO", "BO", "BO"],
        ];
        let s = sheet(&header(), rows);
        let parsed = parse_roster(&s, &RosterConfig::default()).unwrap();

        let mut grid: BTreeMap<u32, BTreeMap<u32, AttendanceValue>> = BTreeMap::new();
        for f in &parsed.facts {
            let prev = grid.entry(f.employee_id).or_default().insert(f.day, f.value.clone());
            assert!(prev.is_none(), "duplicate fact for {} day {}", f.employee_id, f.day);
        }

        for (i, row) in rows.iter().enumerate() {
            let id = (i + 1) as u32;
            for (offset, day) in [1u32, 2, 3].iter().enumerate() {
                let expected = AttendanceValue::from_cell(&t(row[4 + offset]));
                assert_eq!(grid[&id][day], expected);
            }
        }
    }
}
