// File I/O: raw sheet readers (Excel containers, CSV) and report writers

pub mod csv;
pub mod error;
pub mod xlsx;

use std::path::Path;

use provjera_core::RawSheet;

pub use error::IoError;

/// Container family of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// xlsx, xlsm, xls, xlsb, ods (anything calamine can open)
    Spreadsheet,
    /// Delimited text exported from a spreadsheet
    Csv,
}

impl SourceFormat {
    /// Infer the format from a file extension. Unknown extensions are treated
    /// as spreadsheets; calamine sniffs the actual container.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => SourceFormat::Csv,
            _ => SourceFormat::Spreadsheet,
        }
    }
}

/// Read one worksheet from raw file bytes.
///
/// `sheet` selects a worksheet by name; the first sheet is used otherwise.
/// CSV input has a single implicit sheet and ignores `sheet`.
pub fn read_sheet(bytes: &[u8], format: SourceFormat, sheet: Option<&str>) -> Result<RawSheet, IoError> {
    match format {
        SourceFormat::Spreadsheet => xlsx::read_sheet(bytes, sheet),
        SourceFormat::Csv => crate::csv::read_sheet(bytes),
    }
}

/// Content fingerprint of an input file (blake3, hex).
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a.CSV")), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_path(Path::new("a.tsv")), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_path(Path::new("a.xlsx")), SourceFormat::Spreadsheet);
        assert_eq!(SourceFormat::from_path(Path::new("a.xls")), SourceFormat::Spreadsheet);
        assert_eq!(SourceFormat::from_path(Path::new("noext")), SourceFormat::Spreadsheet);
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
        assert_eq!(fingerprint(b"").len(), 64);
    }
}
