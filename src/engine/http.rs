use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{AnalysisInput, EngineError, Evaluator, Verdict};

/// Calls a remote engine service at `{base_url}/analyze`.
pub struct HttpEvaluator {
    client: Client,
    endpoint: String,
}

impl HttpEvaluator {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/analyze", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn evaluate(&self, input: &AnalysisInput) -> Result<Verdict, EngineError> {
        debug!(
            endpoint = %self.endpoint,
            document_type = %input.document_type,
            text_length = input.text.chars().count(),
            "sending deed to remote rule engine"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(input)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    EngineError::Unavailable(format!("request to {} timed out", self.endpoint))
                } else {
                    EngineError::Unavailable(format!("request to {} failed: {err}", self.endpoint))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            EngineError::Unavailable(format!("failed to read engine response: {err}"))
        })?;

        if !status.is_success() {
            warn!(%status, body = %body, "remote rule engine returned an error");
            return Err(EngineError::Execution {
                message: format!("engine responded with status {status}"),
                diagnostics: Some(body),
            });
        }

        Verdict::from_json_text(&body)
    }
}
