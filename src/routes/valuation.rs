use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{AnalysisView, ValuationRequest};
use crate::routes::funds::{analysis_view, session_or_load, validate_code};
use crate::services::session_store::FundSession;
use crate::services::valuation_service::ValuationError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:code/valuation", post(apply_valuation).delete(revert_valuation))
}

pub async fn apply_valuation(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<ValuationRequest>,
) -> Result<Json<AnalysisView>, AppError> {
    info!("POST /api/funds/{}/valuation - change={:?}", code, body.change);
    validate_code(&code)?;

    session_or_load(&state, &code).await?;

    let updated = state
        .sessions
        .update(&code, |current| {
            let analysis = current.analysis.project_text(&body.change)?;
            Ok::<_, ValuationError>(FundSession {
                analysis,
                ..current.clone()
            })
        })
        .ok_or_else(|| AppError::NotFound(format!("No analysis loaded for {}", code)))?
        .map_err(|e| {
            warn!("Rejected valuation '{}' for {}: {}", body.change, code, e);
            AppError::from(e)
        })?;

    Ok(Json(analysis_view(&updated)))
}

pub async fn revert_valuation(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AnalysisView>, AppError> {
    info!("DELETE /api/funds/{}/valuation - Reverting projection", code);
    validate_code(&code)?;

    let updated = state
        .sessions
        .update(&code, |current| {
            Ok::<_, AppError>(FundSession {
                analysis: current.analysis.revert(),
                ..current.clone()
            })
        })
        .ok_or_else(|| AppError::NotFound(format!("No analysis loaded for {}", code)))??;

    Ok(Json(analysis_view(&updated)))
}
