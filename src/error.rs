use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("bad date range: {0}")]
    BadDateRange(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("spreadsheet rendering failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("pdf rendering failed: {0}")]
    Pdf(#[from] lopdf::Error),
}
