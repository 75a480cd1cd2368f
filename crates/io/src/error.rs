use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// The container could not be opened (corrupt file, unsupported format).
    #[error("failed to open spreadsheet: {0}")]
    Open(String),
    #[error("spreadsheet contains no sheets")]
    NoSheets,
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),
    #[error("failed to read sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("xlsx write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}
