use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Local, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{AdviceView, AnalysisView, ChartRow, HistoryRequest, ProjectionView, QuickRange};
use crate::services::export_service;
use crate::services::nav_service::resolve_range;
use crate::services::session_store::FundSession;
use crate::services::valuation_service::AnalysisSession;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:code/analysis", get(get_analysis))
        .route("/:code/export", get(export_series))
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// Also keep a copy under the configured export directory
    #[serde(default)]
    pub save: bool,
}

/// Fund codes are six ASCII digits.
pub(crate) fn validate_code(code: &str) -> Result<(), AppError> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Invalid fund code '{}': expected 6 digits",
            code
        )))
    }
}

/// Fetches the history, runs the analysis and publishes the session unless a
/// newer query for the same code finished first.
pub(crate) async fn load_session(state: &AppState, request: HistoryRequest) -> Result<Arc<FundSession>, AppError> {
    let ticket = state.sessions.begin(&request.code);
    let today = Local::now().date_naive();

    let history = state.nav.fetch_history(&request).await?;
    let snapshot = state.nav.fund_snapshot(&history, today).await;
    let analysis = AnalysisSession::new(history.series.clone(), state.config.scoring_mode);

    if let Err(e) = analysis.report() {
        warn!("⚠️ Advice unavailable for {}: {}", request.code, e);
    }

    let session = FundSession {
        history,
        snapshot,
        analysis,
    };

    if state.sessions.complete(&ticket, session.clone()) {
        Ok(state.sessions.get(&request.code).unwrap_or_else(|| Arc::new(session)))
    } else {
        info!("Result for {} superseded by a newer query", request.code);
        Ok(Arc::new(session))
    }
}

/// Current session of `code`, loading the full history when none exists yet.
pub(crate) async fn session_or_load(state: &AppState, code: &str) -> Result<Arc<FundSession>, AppError> {
    match state.sessions.get(code) {
        Some(session) => Ok(session),
        None => load_session(state, HistoryRequest::unbounded(code)).await,
    }
}

pub(crate) fn analysis_view(session: &FundSession) -> AnalysisView {
    let analysis = &session.analysis;
    let report = analysis.report();
    let projection = analysis.projection();

    AnalysisView {
        code: session.history.code.clone(),
        kind: session.history.kind,
        metadata: session.history.metadata.clone(),
        snapshot: session.snapshot,
        rows: ChartRow::rows(
            analysis.current_series(),
            report.ok().map(|r| &r.indicators),
            projection.map(|p| p.point.date),
        ),
        advice: match report {
            Ok(report) => AdviceView::from(report),
            Err(e) => AdviceView::Unavailable { reason: e.to_string() },
        },
        projection: projection.map(|p| ProjectionView {
            date: p.point.date,
            value: p.point.value,
            change_pct: p.change_pct,
        }),
    }
}

pub async fn get_analysis(
    Path(code): Path<String>,
    Query(query): Query<AnalysisQuery>,
    State(state): State<AppState>,
) -> Result<Json<AnalysisView>, AppError> {
    info!(
        "GET /api/funds/{}/analysis - start={:?} end={:?} range={:?}",
        code, query.start, query.end, query.range
    );
    validate_code(&code)?;

    let range = query
        .range
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(|r| r.parse::<QuickRange>())
        .transpose()
        .map_err(AppError::Validation)?;
    let (start, end) = resolve_range(query.start, query.end, range, Local::now().date_naive())?;

    let session = load_session(&state, HistoryRequest::new(code.clone(), start, end))
        .await
        .map_err(|e| {
            error!("Failed to analyze fund {}: {}", code, e);
            e
        })?;

    Ok(Json(analysis_view(&session)))
}

pub async fn export_series(
    Path(code): Path<String>,
    Query(query): Query<ExportQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    info!("GET /api/funds/{}/export - Exporting NAV series", code);
    validate_code(&code)?;

    let session = session_or_load(&state, &code).await?;
    let series = session.analysis.current_series();
    if series.is_empty() {
        return Err(AppError::InsufficientData(format!("No NAV data to export for {}", code)));
    }

    let bytes = export_service::to_csv_bytes(series).map_err(|e| AppError::Internal(e.to_string()))?;
    let file_name = export_service::export_file_name(&code, session.analysis.projection().is_some(), Utc::now());

    if query.save {
        export_service::write_to_dir(&state.config.export_dir, &file_name, &bytes).map_err(|e| {
            error!("✗ Export of {} failed: {:#}", code, e);
            AppError::Internal(e.to_string())
        })?;
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        bytes,
    )
        .into_response())
}
