use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{EngineConfig, EngineMode};

pub mod http;
pub mod input;
pub mod process;
pub mod rules;
pub mod service;

pub use http::HttpEvaluator;
pub use input::{AnalysisInput, DocumentType, ValidationError};
pub use process::ProcessEvaluator;
pub use rules::{Outcome, RuleEngine};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule engine unavailable: {0}")]
    Unavailable(String),
    #[error("rule engine execution failed: {message}")]
    Execution {
        message: String,
        diagnostics: Option<String>,
    },
    #[error("rule engine returned a malformed response: {0}")]
    Protocol(String),
}

impl EngineError {
    /// Text worth surfacing to the caller beyond the error message itself.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            EngineError::Execution {
                diagnostics: Some(text),
                ..
            } if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }
}

/// A validated engine answer: the outcome plus the engine's raw JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub response: Value,
}

impl Verdict {
    /// Checks that a response is an object whose `result` is a known label.
    pub fn from_response(response: Value) -> Result<Self, EngineError> {
        let label = match response.get("result") {
            Some(Value::String(label)) => label,
            Some(other) => {
                return Err(EngineError::Protocol(format!(
                    "expected string result, got {other}"
                )))
            }
            None => {
                return Err(EngineError::Protocol(
                    "response has no result field".to_string(),
                ))
            }
        };
        let outcome = Outcome::from_label(label).ok_or_else(|| {
            EngineError::Protocol(format!("unknown outcome label '{label}'"))
        })?;
        Ok(Self { outcome, response })
    }

    pub fn from_json_text(raw: &str) -> Result<Self, EngineError> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|err| EngineError::Protocol(format!("invalid JSON: {err}")))?;
        Self::from_response(value)
    }

    pub fn label(&self) -> &'static str {
        self.outcome.label()
    }
}

/// Anything that can turn deed attributes into a verdict.
#[async_trait]
pub trait Evaluator: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn evaluate(&self, input: &AnalysisInput) -> Result<Verdict, EngineError>;
}

#[async_trait]
impl Evaluator for RuleEngine {
    fn name(&self) -> &'static str {
        "builtin"
    }

    async fn evaluate(&self, input: &AnalysisInput) -> Result<Verdict, EngineError> {
        let evaluation = RuleEngine::evaluate(self, input);
        Ok(Verdict {
            outcome: evaluation.outcome,
            response: evaluation.to_response(),
        })
    }
}

pub fn build_evaluator(config: &EngineConfig) -> anyhow::Result<Arc<dyn Evaluator>> {
    let evaluator: Arc<dyn Evaluator> = match &config.mode {
        EngineMode::Builtin => Arc::new(RuleEngine::new()),
        EngineMode::Http { base_url } => Arc::new(HttpEvaluator::new(base_url, config.timeout)?),
        EngineMode::Process { program, args } => Arc::new(ProcessEvaluator::new(
            program.clone(),
            args.clone(),
            config.timeout,
        )),
    };
    Ok(evaluator)
}
