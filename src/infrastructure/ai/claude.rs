use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::entities::AnalysisContext;
use crate::domain::ports::{AnalysisError, AnalysisService};

use super::prompt_builder::PromptBuilder;

/// Maximum response size from the claude CLI (4 MB).
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Maximum stderr bytes included in error messages.
const MAX_STDERR_BYTES: usize = 512;

/// Runs the `claude` CLI in print mode with a prompt built from the context.
pub struct ClaudeCliService {
    binary: String,
    model: String,
    timeout_secs: u64,
}

impl ClaudeCliService {
    #[must_use]
    pub const fn new(binary: String, model: String, timeout_secs: u64) -> Self {
        Self {
            binary,
            model,
            timeout_secs,
        }
    }
}

#[async_trait]
impl AnalysisService for ClaudeCliService {
    async fn analyze(&self, context: &AnalysisContext) -> Result<String, AnalysisError> {
        let prompt = PromptBuilder::build(context);
        tracing::debug!(binary = %self.binary, model = %self.model, "invoking claude CLI");

        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            tokio::process::Command::new(&self.binary)
                .args([
                    "--print",
                    "--output-format",
                    "json",
                    "--model",
                    &self.model,
                    "--",
                    &prompt,
                ])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| AnalysisError::Timeout)?
        .map_err(|e| {
            AnalysisError::ServiceUnavailable(format!("failed to run {}: {e}", self.binary))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(
                &output.stderr[..output.stderr.len().min(MAX_STDERR_BYTES)],
            );
            return Err(AnalysisError::ServiceUnavailable(format!(
                "{} exited with {}: {stderr}",
                self.binary, output.status
            )));
        }

        if output.stdout.len() > MAX_RESPONSE_BYTES {
            return Err(AnalysisError::InvalidResponse(format!(
                "response too large: {} bytes",
                output.stdout.len()
            )));
        }

        parse_response(&output.stdout)
    }
}

#[derive(Deserialize)]
struct ClaudeCliResponse {
    result: String,
}

/// Extracts the answer text, unwrapping the CLI's JSON envelope when present.
fn parse_response(stdout: &[u8]) -> Result<String, AnalysisError> {
    let text = std::str::from_utf8(stdout)
        .map_err(|e| AnalysisError::InvalidResponse(format!("invalid UTF-8: {e}")))?;

    let answer = match serde_json::from_str::<ClaudeCliResponse>(text) {
        Ok(envelope) => envelope.result,
        Err(_) => text.to_owned(),
    };

    let answer = answer.trim();
    if answer.is_empty() {
        return Err(AnalysisError::InvalidResponse(
            "empty response from claude".into(),
        ));
    }
    Ok(answer.to_owned())
}
