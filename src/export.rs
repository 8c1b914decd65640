use tracing::info;

use crate::aggregate::Aggregator;
use crate::db::ResponseStore;
use crate::error::ReportError;
use crate::pdf::{self, FontSource};
use crate::range::DateRange;
use crate::xlsx;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: &'static str,
}

#[derive(Debug, Clone)]
pub enum PdfExport {
    Document(ExportFile),
    /// A bound was missing; the caller should go back to the dashboard.
    Dashboard,
}

pub async fn export_spreadsheet(
    store: &dyn ResponseStore,
    from: &str,
    to: &str,
) -> Result<ExportFile, ReportError> {
    let range = DateRange::parse(from, to)?;
    let rows = Aggregator::new(store).rows(Some(&range)).await?;

    let bytes = xlsx::render(&range, &rows)?;
    info!(%range, rows = rows.len(), bytes = bytes.len(), "spreadsheet exported");

    Ok(ExportFile {
        bytes,
        filename: format!("survey_report_{range}.xlsx"),
        mime: XLSX_MIME,
    })
}

pub async fn export_pdf(
    store: &dyn ResponseStore,
    from: &str,
    to: &str,
    font: &FontSource,
) -> Result<PdfExport, ReportError> {
    if from.trim().is_empty() || to.trim().is_empty() {
        info!("pdf export requested without a full range, sending to dashboard");
        return Ok(PdfExport::Dashboard);
    }

    let range = DateRange::parse(from, to)?;
    let report = Aggregator::new(store).report(range).await?;

    let bytes = pdf::render(&report, font)?;
    info!(%range, rows = report.total(), bytes = bytes.len(), "pdf exported");

    Ok(PdfExport::Document(ExportFile {
        bytes,
        filename: format!("survey_report_{range}.pdf"),
        mime: PDF_MIME,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{response, MemoryStore, UnreachableStore};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn malformed_range_never_reaches_the_store() {
        let store = UnreachableStore::default();

        let err = export_spreadsheet(&store, "not-a-date", "2024-01-10")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::BadDateRange(_)));

        let err = export_spreadsheet(&store, "", "").await.unwrap_err();
        assert!(matches!(err, ReportError::BadDateRange(_)));

        let err = export_pdf(&store, "2024-01-01", "2024-13-01", &FontSource::Helvetica)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::BadDateRange(_)));

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn pdf_without_range_goes_to_dashboard() {
        let store = UnreachableStore::default();

        let outcome = export_pdf(&store, "", "2024-01-10", &FontSource::Helvetica)
            .await
            .unwrap();
        assert!(matches!(outcome, PdfExport::Dashboard));

        let outcome = export_pdf(&store, "2024-01-10", "", &FontSource::Helvetica)
            .await
            .unwrap();
        assert!(matches!(outcome, PdfExport::Dashboard));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn exports_are_named_after_the_range() {
        let store = MemoryStore::with_rows(vec![response(
            1,
            "Phone",
            Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap(),
        )]);

        let sheet = export_spreadsheet(&store, "2024-01-01", "2024-01-10")
            .await
            .unwrap();
        assert_eq!(sheet.filename, "survey_report_2024-01-01_to_2024-01-10.xlsx");
        assert_eq!(sheet.mime, XLSX_MIME);
        assert!(sheet.bytes.starts_with(b"PK"));

        let PdfExport::Document(file) =
            export_pdf(&store, "2024-01-01", "2024-01-10", &FontSource::Helvetica)
                .await
                .unwrap()
        else {
            panic!("expected a document");
        };
        assert_eq!(file.filename, "survey_report_2024-01-01_to_2024-01-10.pdf");
        assert_eq!(file.mime, PDF_MIME);
        assert!(file.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_error() {
        let store = UnreachableStore::default();
        let err = export_spreadsheet(&store, "2024-01-01", "2024-01-02")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Store(_)));
        assert_eq!(store.calls(), 1);
    }
}
