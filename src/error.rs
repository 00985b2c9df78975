use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::analysis::AnalysisError;
use crate::engine::{EngineError, ValidationError};
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Deed not found")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            details: self.details,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => AppError::not_found(),
            other => AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                .with_details(other.to_string()),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(value: EngineError) -> Self {
        let details = match value.diagnostics() {
            Some(diagnostics) => format!("{value}: {diagnostics}"),
            None => value.to_string(),
        };
        AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to analyze deed with rule engine",
        )
        .with_details(details)
    }
}

impl From<AnalysisError> for AppError {
    fn from(value: AnalysisError) -> Self {
        match value {
            AnalysisError::Store(err) => err.into(),
            AnalysisError::Engine(err) => err.into(),
            AnalysisError::InvalidRecord(err) => {
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    .with_details(format!("stored deed cannot be analyzed: {err}"))
            }
        }
    }
}
