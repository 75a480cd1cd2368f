// Excel file import (xlsx, xls, xlsb, ods) and report export (xlsx only)
//
// Import: the selected worksheet is converted to a RawSheet anchored at A1,
//         so row indexes match what a user sees in the source file.
// Export: one worksheet per Table, header row bold and frozen.

use std::collections::HashSet;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use provjera_core::{Cell, RawSheet, Table};
use rust_xlsxwriter::{ExcelDateTime as XlsxDateTime, Format, Workbook, Worksheet};

use crate::error::IoError;

/// Excel's limit on worksheet name length
const MAX_SHEET_NAME: usize = 31;

/// Read one worksheet from in-memory spreadsheet bytes.
pub fn read_sheet(bytes: &[u8], sheet: Option<&str>) -> Result<RawSheet, IoError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| IoError::Open(e.to_string()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| IoError::SheetNotFound(name.to_string()))?,
        None => sheet_names.first().cloned().ok_or(IoError::NoSheets)?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::Sheet {
            sheet: sheet_name.clone(),
            message: e.to_string(),
        })?;

    let raw = range_to_sheet(&sheet_name, &range);
    tracing::debug!(sheet = %sheet_name, rows = raw.height(), cols = raw.width(), "read worksheet");
    Ok(raw)
}

/// Materialize a calamine range as an absolute grid starting at A1.
fn range_to_sheet(name: &str, range: &Range<Data>) -> RawSheet {
    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }

    RawSheet::new(name, rows)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Bool(*b),
        // Store error as text representation
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => convert_datetime(dt),
        Data::DateTimeIso(s) => parse_iso_datetime(s).unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Serial values below one day are time-of-day cells (clock-in/out columns);
/// midnight datetimes are plain dates.
fn convert_datetime(dt: &ExcelDateTime) -> Cell {
    let serial = dt.as_f64();
    if dt.is_duration() {
        return Cell::Text(format_duration(serial));
    }
    match dt.as_datetime() {
        Some(ndt) if serial < 1.0 => Cell::Time(ndt.time()),
        Some(ndt) if ndt.time() == NaiveTime::MIN => Cell::Date(ndt.date()),
        Some(ndt) => Cell::DateTime(ndt),
        None => Cell::Number(serial),
    }
}

/// Render a duration given in days as `H:MM:SS` (hours may exceed 24).
fn format_duration(days: f64) -> String {
    let total = (days * 86_400.0).round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!("{sign}{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn parse_iso_datetime(s: &str) -> Option<Cell> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(if dt.time() == NaiveTime::MIN { Cell::Date(dt.date()) } else { Cell::DateTime(dt) });
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Cell::Date(d));
    }
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok().map(Cell::Time)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

struct CellFormats {
    header: Format,
    date: Format,
    datetime: Format,
    time: Format,
}

impl CellFormats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format("dd.mm.yyyy"),
            datetime: Format::new().set_num_format("dd.mm.yyyy hh:mm:ss"),
            time: Format::new().set_num_format("hh:mm:ss"),
        }
    }
}

/// Serialize tables into an xlsx container, one worksheet per table, in order.
///
/// Sheet names are sanitized for Excel and de-duplicated. An empty table list
/// still produces a valid workbook with a single blank sheet.
pub fn write_workbook<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Result<Vec<u8>, IoError> {
    let mut workbook = Workbook::new();
    let formats = CellFormats::new();
    let mut used_names = HashSet::new();

    for table in tables {
        let name = unique_sheet_name(&table.name, &mut used_names);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;
        write_table(worksheet, table, &formats)?;
    }

    if used_names.is_empty() {
        workbook.add_worksheet();
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(sheets = used_names.len(), bytes = bytes.len(), "wrote workbook");
    Ok(bytes)
}

fn write_table(worksheet: &mut Worksheet, table: &Table, formats: &CellFormats) -> Result<(), IoError> {
    for (col, header) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &formats.header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row32 = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, row32, col as u16, cell, formats)?;
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    formats: &CellFormats,
) -> Result<(), IoError> {
    match cell {
        Cell::Empty => {}
        Cell::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        Cell::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Cell::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Cell::Date(d) => match excel_date(*d) {
            Some(dt) => {
                worksheet.write_datetime_with_format(row, col, &dt, &formats.date)?;
            }
            None => {
                worksheet.write_string(row, col, cell.to_string())?;
            }
        },
        Cell::DateTime(ndt) => {
            let dt = excel_date(ndt.date()).and_then(|d| {
                d.and_hms(ndt.hour() as u16, ndt.minute() as u8, ndt.second() as f64).ok()
            });
            match dt {
                Some(dt) => {
                    worksheet.write_datetime_with_format(row, col, &dt, &formats.datetime)?;
                }
                None => {
                    worksheet.write_string(row, col, cell.to_string())?;
                }
            }
        }
        Cell::Time(t) => {
            let dt = XlsxDateTime::from_hms(t.hour() as u16, t.minute() as u8, t.second() as f64)?;
            worksheet.write_datetime_with_format(row, col, &dt, &formats.time)?;
        }
    }
    Ok(())
}

fn excel_date(d: NaiveDate) -> Option<XlsxDateTime> {
    let year = u16::try_from(d.year()).ok()?;
    XlsxDateTime::from_ymd(year, d.month() as u8, d.day() as u8).ok()
}

/// Make a table name legal as an Excel sheet name and unique within the workbook.
fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base: String = if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut candidate = base.clone();
    let mut n = 2;
    // Excel compares sheet names case-insensitively
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tables() -> Vec<Table> {
        let mut roster = Table::new("MasterTeam", ["Rbr", "PREZIME i IME", "Day", "Value"]);
        roster.push_row(vec![Cell::Number(1.0), Cell::text("Ana Anić"), Cell::Number(5.0), Cell::Number(8.0)]);
        roster.push_row(vec![Cell::Number(1.0), Cell::text("Ana Anić"), Cell::Number(6.0), Cell::text("GO")]);

        let mut merged = Table::new("Merged Report", ["PREZIME i IME", "Full_Date", "Value"]);
        merged.push_row(vec![
            Cell::text("Ana Anić"),
            Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
            Cell::Empty,
        ]);
        vec![roster, merged]
    }

    #[test]
    fn test_unique_sheet_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("Merged Report", &mut used), "Merged Report");
        assert_eq!(unique_sheet_name("merged report", &mut used), "merged report (2)");
        assert_eq!(unique_sheet_name("a/b:c", &mut used), "a_b_c");
        assert_eq!(unique_sheet_name("", &mut used), "Sheet");
        let long = "x".repeat(40);
        let first = unique_sheet_name(&long, &mut used);
        assert_eq!(first.chars().count(), MAX_SHEET_NAME);
        let second = unique_sheet_name(&long, &mut used);
        assert_eq!(second.chars().count(), MAX_SHEET_NAME);
        assert!(second.ends_with(" (2)"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.5), "12:00:00");
        assert_eq!(format_duration(1.25), "30:00:00");
        assert_eq!(format_duration(8.0 / 24.0 + 15.0 / 1440.0), "8:15:00");
    }

    #[test]
    fn test_parse_iso_datetime() {
        assert_eq!(
            parse_iso_datetime("2024-03-05T00:00:00"),
            Some(Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()))
        );
        assert_eq!(
            parse_iso_datetime("07:30:00"),
            Some(Cell::Time(NaiveTime::from_hms_opt(7, 30, 0).unwrap()))
        );
        assert_eq!(parse_iso_datetime("garbage"), None);
    }

    #[test]
    fn test_write_then_read_back() {
        let bytes = write_workbook(&sample_tables()).unwrap();
        assert!(bytes.len() > 100);

        let roster = read_sheet(&bytes, None).unwrap();
        assert_eq!(roster.name, "MasterTeam");
        assert_eq!(roster.cell(0, 1), &Cell::text("PREZIME i IME"));
        assert_eq!(roster.cell(1, 3), &Cell::Number(8.0));
        assert_eq!(roster.cell(2, 3), &Cell::text("GO"));

        let merged = read_sheet(&bytes, Some("Merged Report")).unwrap();
        assert_eq!(
            merged.cell(1, 1).as_date(),
            Some(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        );
    }

    #[test]
    fn test_read_missing_sheet() {
        let bytes = write_workbook(&sample_tables()).unwrap();
        let err = read_sheet(&bytes, Some("Nope")).unwrap_err();
        assert!(matches!(err, IoError::SheetNotFound(ref s) if s == "Nope"));
    }

    #[test]
    fn test_read_garbage_fails() {
        let err = read_sheet(b"definitely not a spreadsheet", None).unwrap_err();
        assert!(matches!(err, IoError::Open(_)));
    }

    #[test]
    fn test_range_offset_is_materialized() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(3, 2, "Rbr").unwrap();
        worksheet.write_number(4, 2, 1.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sheet = read_sheet(&bytes, None).unwrap();
        assert_eq!(sheet.cell(3, 2), &Cell::text("Rbr"));
        assert_eq!(sheet.cell(4, 2), &Cell::Number(1.0));
        assert!(sheet.row(0).is_empty());
    }

    #[test]
    fn test_empty_table_list() {
        let bytes = write_workbook(std::iter::empty::<&Table>()).unwrap();
        let sheet = read_sheet(&bytes, None).unwrap();
        assert!(sheet.is_empty());
    }
}
