use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use serde_json::Value;
use tracing::{error, info};

use crate::engine::AnalysisInput;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Analyzes the request body directly; no deed is read or written.
pub async fn analyze_payload(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(body) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let input = AnalysisInput::from_complete_payload(&body)?;

    let verdict = state.evaluator.evaluate(&input).await.map_err(|err| {
        error!(
            engine = state.evaluator.name(),
            error = %err,
            diagnostics = err.diagnostics().unwrap_or(""),
            "stateless deed analysis failed"
        );
        AppError::from(err)
    })?;
    info!(
        engine = state.evaluator.name(),
        outcome = verdict.outcome.code(),
        "stateless deed analysis finished"
    );

    Ok(Json(verdict.response))
}
