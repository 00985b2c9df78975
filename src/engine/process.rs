use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{AnalysisInput, EngineError, Evaluator, Verdict};

/// Runs an engine executable once per evaluation: the payload goes to stdin,
/// a single JSON object is expected on stdout.
pub struct ProcessEvaluator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessEvaluator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl Evaluator for ProcessEvaluator {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn evaluate(&self, input: &AnalysisInput) -> Result<Verdict, EngineError> {
        let payload = serde_json::to_vec(input)
            .map_err(|err| EngineError::Protocol(format!("failed to encode payload: {err}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    EngineError::Unavailable(format!("engine binary {} not found", self.program))
                } else {
                    EngineError::Unavailable(format!("failed to start {}: {err}", self.program))
                }
            })?;

        // Dropping `exchange` on timeout drops the child, which kills it.
        let program = &self.program;
        let exchange = async move {
            if let Some(mut stdin) = child.stdin.take() {
                match stdin.write_all(&payload).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                        debug!(%program, "engine closed stdin early");
                    }
                    Err(err) => {
                        return Err(EngineError::Unavailable(format!(
                            "failed to write payload to engine: {err}"
                        )))
                    }
                }
            }
            child.wait_with_output().await.map_err(|err| {
                EngineError::Unavailable(format!("failed to collect engine output: {err}"))
            })
        };

        let output = timeout(self.timeout, exchange).await.map_err(|_| {
            EngineError::Unavailable(format!(
                "engine did not finish within {}s",
                self.timeout.as_secs_f64()
            ))
        })??;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(EngineError::Execution {
                message: format!("engine exited with {}", output.status),
                diagnostics: Some(stderr),
            });
        }
        if !stderr.trim().is_empty() {
            warn!(program = %self.program, stderr = %stderr.trim(), "engine wrote to stderr");
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|err| EngineError::Protocol(format!("engine output is not UTF-8: {err}")))?;
        Verdict::from_json_text(&stdout)
    }
}
