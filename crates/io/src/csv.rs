// CSV/TSV import and export
//
// Spreadsheet tools frequently export the roster and travel register as
// delimited text. Every field is kept as text; the parsers coerce numbers
// and dates themselves.

use provjera_core::{Cell, RawSheet, Table};

use crate::error::IoError;

/// Read delimited text into a RawSheet (one implicit sheet named "csv").
///
/// Blank lines become empty rows, so row indexes match the spreadsheet the
/// text was exported from.
pub fn read_sheet(bytes: &[u8]) -> Result<RawSheet, IoError> {
    let content = decode_utf8(bytes);
    let delimiter = sniff_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    let mut next_line = 1u64;
    for result in reader.records() {
        let record = result?;
        // The reader drops blank lines; its line numbers show where they were.
        let line = record.position().map_or(next_line, |p| p.line());
        while next_line < line {
            rows.push(Vec::new());
            next_line += 1;
        }
        let embedded: u64 = record.iter().map(|f| f.matches('\n').count() as u64).sum();
        next_line = line + embedded + 1;
        rows.push(
            record
                .iter()
                .map(|field| if field.is_empty() { Cell::Empty } else { Cell::text(field) })
                .collect(),
        );
    }

    tracing::debug!(rows = rows.len(), delimiter = %(delimiter as char), "read CSV");
    Ok(RawSheet::new("csv", rows))
}

/// Write a table as CSV (header row first, display text for every cell).
pub fn write_table(table: &Table) -> Result<Vec<u8>, IoError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| IoError::Csv(e.into_error().into()))
}

/// Decode as UTF-8 (BOM stripped), falling back to Windows-1252, which is
/// what Excel on Croatian-locale Windows produces.
fn decode_utf8(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Score: lines agreeing with the widest line's field count, times that count.
        // Banner rows above the header are usually narrower than the data.
        let target = counts.iter().copied().max().unwrap_or(0);
        if target <= 1 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_semicolon() {
        let content = "Rbr;PREZIME i IME;Po 1\n1;Ana;8\n2;Ivo;GO\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniff_prefers_data_width_over_banner() {
        // Banner line has no delimiter at all; the table below is comma-separated
        let content = "EVIDENCIJA RADNOG VREMENA\n\n,Rbr,PREZIME i IME,Po 1,Ut 2\n,1,Ana,8,8\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn read_keeps_grid_positions() {
        let sheet = read_sheet(b"a,,c\n\n1,2\n").unwrap();
        assert_eq!(sheet.height(), 3);
        assert_eq!(sheet.cell(0, 0), &Cell::text("a"));
        assert_eq!(sheet.cell(0, 1), &Cell::Empty);
        assert_eq!(sheet.cell(0, 2), &Cell::text("c"));
        assert!(sheet.row(1).is_empty());
        assert_eq!(sheet.cell(2, 1), &Cell::text("2"));
    }

    #[test]
    fn blank_banner_lines_keep_header_row_index() {
        let text = "PUTNI NALOZI;;\n\n\nBroj PN;Prezime i ime;Dat. Polaska\nPN-1;Ana;01.03.2024\n";
        let sheet = read_sheet(text.as_bytes()).unwrap();
        assert_eq!(sheet.cell(3, 0), &Cell::text("Broj PN"));
        assert_eq!(sheet.cell(4, 1), &Cell::text("Ana"));
    }

    #[test]
    fn quoted_newline_does_not_shift_rows() {
        let sheet = read_sheet(b"a,\"two\nlines\"\n\nb,c\n").unwrap();
        assert_eq!(sheet.height(), 3);
        assert_eq!(sheet.cell(0, 1), &Cell::text("two\nlines"));
        assert_eq!(sheet.cell(2, 0), &Cell::text("b"));
    }

    #[test]
    fn read_windows_1252_fallback() {
        // 0x8A = Š, 0xE6 = æ in Windows-1252; neither is valid UTF-8 on its own
        let bytes = b"ime\n\x8Aimi\xE6\n";
        let sheet = read_sheet(bytes).unwrap();
        assert_eq!(sheet.cell(1, 0), &Cell::text("Šimiæ"));
    }

    #[test]
    fn read_strips_bom() {
        let sheet = read_sheet("\u{feff}Rbr,Ime\n".as_bytes()).unwrap();
        assert_eq!(sheet.cell(0, 0), &Cell::text("Rbr"));
    }

    #[test]
    fn write_table_roundtrip_text() {
        let mut t = Table::new("x", ["Prezime Ime", "Datum"]);
        t.push_row(vec![Cell::text("Ana, Anić"), Cell::text("05.03.2024")]);
        let bytes = write_table(&t).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Prezime Ime,Datum\n\"Ana, Anić\",05.03.2024\n");
    }
}
