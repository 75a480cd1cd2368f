// Travel-order register ("putni nalozi"): one row per order with a
// departure/return range, expanded into one fact per covered day.

use provjera_core::{Cell, RawSheet};

use crate::config::TravelConfig;
use crate::dates::parse_date_cell;
use crate::error::ReconError;
use crate::model::{SourceKind, TravelFact};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelParse {
    pub facts: Vec<TravelFact>,
    /// Orders that produced at least one fact.
    pub orders: usize,
    /// Orders skipped for an unparseable date or a blank name.
    pub dropped_rows: usize,
}

struct Columns {
    order: usize,
    name: usize,
    reason: usize,
    departure: usize,
    ret: usize,
}

impl Columns {
    fn locate(sheet: &RawSheet, config: &TravelConfig) -> Result<Self, ReconError> {
        let header = sheet.row(config.header_row);
        let find = |name: &str| {
            header
                .iter()
                .position(|c| c.to_string().trim() == name.trim())
                .ok_or_else(|| ReconError::MissingColumn {
                    input: SourceKind::Travel,
                    column: name.to_string(),
                })
        };
        Ok(Self {
            order: find(&config.order_column)?,
            name: find(&config.name_column)?,
            reason: find(&config.reason_column)?,
            departure: find(&config.departure_column)?,
            ret: find(&config.return_column)?,
        })
    }
}

pub fn expand_travel_orders(sheet: &RawSheet, config: &TravelConfig) -> Result<TravelParse, ReconError> {
    if sheet.height() <= config.header_row {
        tracing::warn!(sheet = %sheet.name, "travel register has no header row");
        return Ok(TravelParse::default());
    }
    let cols = Columns::locate(sheet, config)?;

    let mut parsed = TravelParse::default();
    for row in config.header_row + 1..sheet.height() {
        if sheet.row(row).iter().all(Cell::is_blank) {
            continue;
        }
        if matches!(sheet.cell(row, cols.order), Cell::Text(s) if *s == config.total_sentinel) {
            continue;
        }

        let departure = parse_date_cell(sheet.cell(row, cols.departure));
        let ret = parse_date_cell(sheet.cell(row, cols.ret));
        let name = sheet.cell(row, cols.name).trimmed_text();
        let (Some(departure), Some(ret), Some(name)) = (departure, ret, name) else {
            tracing::debug!(row, "travel order skipped: missing name or unparseable dates");
            parsed.dropped_rows += 1;
            continue;
        };

        let reason = sheet.cell(row, cols.reason).trimmed_text();
        let before = parsed.facts.len();
        parsed.facts.extend(
            departure
                .iter_days()
                .take_while(|day| *day <= ret)
                .map(|date| TravelFact {
                    employee_name: name.clone(),
                    date,
                    reason: reason.clone(),
                }),
        );
        if parsed.facts.len() > before {
            parsed.orders += 1;
        } else {
            tracing::debug!(row, %departure, %ret, "travel order returns before it departs");
        }
    }

    tracing::info!(
        orders = parsed.orders,
        facts = parsed.facts.len(),
        dropped_rows = parsed.dropped_rows,
        "travel orders expanded"
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn t(s: &str) -> Cell {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::text(s)
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn register(rows: &[&[&str]]) -> RawSheet {
        let mut grid = vec![
            vec![t("PUTNI NALOZI")],
            vec![],
            vec![t("Ožujak 2024")],
            vec![
                t("Broj PN\n"),
                t("Prezime i ime"),
                t("Zadatak službenog puta"),
                t("Dat. Polaska"),
                t("Dat. Povratka"),
            ],
        ];
        grid.extend(rows.iter().map(|r| r.iter().map(|s| t(s)).collect()));
        RawSheet::new("PN", grid)
    }

    #[test]
    fn expands_inclusive_range() {
        let sheet = register(&[&["12/24", "Anić Ana", "Sajam", "10.03.2024", "12.03.2024"]]);
        let parsed = expand_travel_orders(&sheet, &TravelConfig::default()).unwrap();
        let dates: Vec<NaiveDate> = parsed.facts.iter().map(|f| f.date).collect();
        assert_eq!(dates, vec![d(10), d(11), d(12)]);
        assert!(parsed.facts.iter().all(|f| f.employee_name == "Anić Ana"));
        assert_eq!(parsed.facts[0].reason.as_deref(), Some("Sajam"));
        assert_eq!(parsed.orders, 1);
    }

    #[test]
    fn same_day_and_reversed_ranges() {
        let sheet = register(&[
            &["1", "Ana", "Sastanak", "05.03.2024", "05.03.2024"],
            &["2", "Ivo", "Greška", "09.03.2024", "08.03.2024"],
        ]);
        let parsed = expand_travel_orders(&sheet, &TravelConfig::default()).unwrap();
        assert_eq!(parsed.facts.len(), 1);
        assert_eq!(parsed.facts[0].date, d(5));
        assert_eq!(parsed.orders, 1);
    }

    #[test]
    fn excludes_total_row_and_bad_dates() {
        let sheet = register(&[
            &["1", "Ana", "", "01.03.2024", "02.03.2024"],
            &["2", "Ivo", "Put", "nepoznato", "02.03.2024"],
            &["3", "", "Put", "01.03.2024", "01.03.2024"],
            &["SVEUKUPNO", "", "", "01.03.2024", "31.03.2024"],
            &[],
        ]);
        let parsed = expand_travel_orders(&sheet, &TravelConfig::default()).unwrap();
        assert_eq!(parsed.facts.len(), 2);
        assert_eq!(parsed.facts[0].reason, None);
        assert_eq!(parsed.dropped_rows, 2);
    }

    #[test]
    fn sentinel_match_is_exact() {
        let sheet = register(&[&["Sveukupno", "Ana", "Put", "01.03.2024", "01.03.2024"]]);
        let parsed = expand_travel_orders(&sheet, &TravelConfig::default()).unwrap();
        assert_eq!(parsed.facts.len(), 1);
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut sheet = register(&[]);
        sheet.rows[3][4] = t("Povratak");
        let err = expand_travel_orders(&sheet, &TravelConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ReconError::MissingColumn {
                input: SourceKind::Travel,
                column: "Dat. Povratka".into()
            }
        );
    }

    #[test]
    fn spans_month_boundary() {
        let sheet = register(&[&["7", "Ana", "Put", "30.03.2024", "02.04.2024"]]);
        let parsed = expand_travel_orders(&sheet, &TravelConfig::default()).unwrap();
        assert_eq!(parsed.facts.len(), 4);
        assert_eq!(parsed.facts[3].date, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
    }
}
