//! HTTP face of the rule engine, served by `engine serve` and consumed by
//! [`super::HttpEvaluator`].

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{AnalysisInput, DocumentType, RuleEngine};
use crate::error::{AppError, AppResult};

const SAMPLE_TEXT: &str = "This non-movable property deed number 1234 was executed on 1403/06/07. \
The seller, Mr. Ahmad Ahmadi, transfers six donums of a piece of land with agricultural use \
covering 500 square meters located in ABC village to the buyer, Ms. Sara Saraei. \
This transaction was executed based on Article 10 of the Civil Code and with all legal conditions. \
The buyer is obligated to pay the remaining amount of the purchase price within three months, \
otherwise the seller shall have the right to rescind the transaction. \
This deed was executed based on inquiry response number 11-A dated 1403/05/10 from the \
Registration of Deeds and Property Office.";

pub fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/analyze/sample", get(analyze_sample))
        .layer(TraceLayer::new_for_http())
}

/// A fixed deed used to smoke-test a running engine.
pub fn sample_input() -> AnalysisInput {
    AnalysisInput {
        document_type: DocumentType::Booklet,
        has_inquiry_history: true,
        inquiry_date: NaiveDate::from_ymd_opt(2025, 7, 20),
        deed_date: NaiveDate::from_ymd_opt(2025, 8, 15),
        uses_tashil_law: false,
        inquiry_response_has_issue: false,
        text: SAMPLE_TEXT.to_string(),
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Deed analysis engine is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "message": "engine is running normally",
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

async fn analyze(payload: Result<Json<Value>, JsonRejection>) -> AppResult<Json<Value>> {
    let Json(body) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let input = AnalysisInput::from_payload(&body)?;
    Ok(Json(run(&input)))
}

async fn analyze_sample() -> Json<Value> {
    Json(run(&sample_input()))
}

fn run(input: &AnalysisInput) -> Value {
    let evaluation = RuleEngine::new().evaluate(input);
    info!(
        document_type = %input.document_type,
        has_inquiry_history = input.has_inquiry_history,
        uses_tashil_law = input.uses_tashil_law,
        inquiry_response_has_issue = input.inquiry_response_has_issue,
        text_length = input.text.chars().count(),
        outcome = evaluation.outcome.code(),
        "deed analysis completed"
    );
    evaluation.to_response()
}
