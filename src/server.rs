use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::db::ResponseStore;
use crate::error::ReportError;
use crate::export::{self, ExportFile, PdfExport};
use crate::models::NewSurveyResponse;
use crate::pdf::FontSource;
use crate::report::{self, Dashboard};

pub const DASHBOARD_PATH: &str = "/admin/dashboard";

pub struct AppState {
    pub store: Arc<dyn ResponseStore>,
    pub font: FontSource,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidSubmission(String),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidSubmission(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Report(ReportError::BadDateRange(_)) => StatusCode::BAD_REQUEST,
            AppError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("request failed: {self:#}");
            return (status, "internal server error").into_response();
        }

        (status, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(submit_handler))
        .route(DASHBOARD_PATH, get(dashboard_handler))
        .route("/admin/export/excel", get(excel_handler))
        .route("/admin/export/pdf", get(pdf_handler))
        .with_state(state)
}

fn attachment(file: ExportFile) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response()
}

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<NewSurveyResponse>,
) -> Result<Response, AppError> {
    let response = payload.validate().map_err(AppError::InvalidSubmission)?;
    let stored = state
        .store
        .insert(&response, Utc::now())
        .await
        .map_err(ReportError::from)?;

    info!(id = stored.id, "survey response stored");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": stored.id }))).into_response())
}

async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(report::build_dashboard(state.store.as_ref()).await?))
}

async fn excel_handler(
    State(state): State<Arc<AppState>>,
    Query(range): Query<RangeQuery>,
) -> Result<Response, AppError> {
    let file = export::export_spreadsheet(state.store.as_ref(), &range.from, &range.to).await?;
    Ok(attachment(file))
}

async fn pdf_handler(
    State(state): State<Arc<AppState>>,
    Query(range): Query<RangeQuery>,
) -> Result<Response, AppError> {
    match export::export_pdf(state.store.as_ref(), &range.from, &range.to, &state.font).await? {
        PdfExport::Document(file) => Ok(attachment(file)),
        PdfExport::Dashboard => Ok(Redirect::to(DASHBOARD_PATH).into_response()),
    }
}

pub async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
