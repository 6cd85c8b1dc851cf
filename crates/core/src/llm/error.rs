use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

/// Failure talking to a text-generation provider, with whatever the provider sent back.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// Rate limits and server-side failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self.status, Some(s) if s == 429 || s >= 500)
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}",
            self.provider, self.stage
        )?;
        if let Some(status) = self.status {
            write!(f, ", status={status}")?;
        }
        write!(f, "): {}", self.detail)
    }
}

impl std::error::Error for LlmDiagnosticsError {}
