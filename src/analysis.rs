//! Analyze operation: load a deed, run it through the configured evaluator and
//! persist the verdict.

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::{AnalysisInput, EngineError, Evaluator, ValidationError};
use crate::models::Deed;
use crate::store::{DeedStore, StoreError};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("stored deed is not analyzable: {0}")]
    InvalidRecord(#[from] ValidationError),
}

#[derive(Debug, Clone)]
pub struct AnalyzedDeed {
    pub deed: Deed,
    pub analysis: Value,
}

/// Runs one analysis for `id`. The evaluator always sees the persisted field
/// values; the store is written only after a successful verdict, and then in
/// a single update of both analysis fields.
pub async fn analyze_deed(
    store: &dyn DeedStore,
    evaluator: &dyn Evaluator,
    id: Uuid,
) -> Result<AnalyzedDeed, AnalysisError> {
    let deed = store.get(id).await?;
    let input = AnalysisInput::try_from(&deed).map_err(|err| {
        error!(deed_id = %id, error = %err, "stored deed cannot be analyzed");
        err
    })?;

    info!(
        deed_id = %id,
        engine = evaluator.name(),
        document_type = %input.document_type,
        has_inquiry_history = input.has_inquiry_history,
        uses_tashil_law = input.uses_tashil_law,
        inquiry_response_has_issue = input.inquiry_response_has_issue,
        text_length = input.text.chars().count(),
        "sending deed to rule engine"
    );

    let verdict = evaluator.evaluate(&input).await.map_err(|err| {
        error!(
            deed_id = %id,
            engine = evaluator.name(),
            error = %err,
            diagnostics = err.diagnostics().unwrap_or(""),
            "rule engine invocation failed"
        );
        err
    })?;

    let analyzed_at = Utc::now().naive_utc();
    let deed = store
        .record_analysis(id, verdict.label(), analyzed_at)
        .await
        .map_err(|err| {
            error!(deed_id = %id, error = %err, "failed to persist analysis result");
            err
        })?;

    info!(
        deed_id = %id,
        outcome = verdict.outcome.code(),
        "deed analysis stored"
    );

    Ok(AnalyzedDeed {
        deed,
        analysis: verdict.response,
    })
}
