use crate::config::Settings;
use crate::domain::summary::Summary;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::prompts;
use crate::llm::{Provider, SummaryClient};
use crate::retry::{self, RetryPolicy};
use anyhow::Context;
use chrono_tz::Tz;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f64 = 0.7;
const CONNECTION_TEST_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_output_tokens: u32,
    timezone: Tz,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_google_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let max_output_tokens = std::env::var("GEMINI_MAX_OUTPUT_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);

        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        tracing::info!(model = %settings.ai_model, "AI summarizer initialized");

        Ok(Self {
            http,
            api_key,
            base_url,
            model: settings.ai_model.clone(),
            max_output_tokens,
            timezone: settings.timezone,
            retry: RetryPolicy::api(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate_content(
        &self,
        req: &GenerateContentRequest,
    ) -> anyhow::Result<(serde_json::Value, GenerateContentResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);

        let res = self
            .http
            .post(self.url())
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            let message = raw_response_json
                .as_ref()
                .and_then(|v| v.pointer("/error/message"))
                .and_then(|v| v.as_str())
                .unwrap_or("request rejected");
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "http",
                status: Some(status.as_u16()),
                detail: message.to_string(),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse Gemini response JSON: {text}"))?;
        let parsed = serde_json::from_value::<GenerateContentResponse>(raw_json.clone())
            .context("failed to decode Gemini response into GenerateContentResponse")?;
        Ok((raw_json, parsed))
    }

    async fn generate_with_retry(
        &self,
        req: GenerateContentRequest,
    ) -> anyhow::Result<(serde_json::Value, GenerateContentResponse)> {
        let req = &req;
        retry::retry("gemini generateContent", self.retry, is_retryable, move || {
            self.generate_content(req)
        })
        .await
    }

    fn request(
        &self,
        system: Option<String>,
        prompt: String,
        max_output_tokens: u32,
    ) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: system.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: Some(TEMPERATURE),
                max_output_tokens,
            },
        }
    }

    /// Concatenated text of the first candidate.
    fn response_text(
        res: &GenerateContentResponse,
        raw_json: &serde_json::Value,
    ) -> anyhow::Result<String> {
        let Some(candidate) = res.candidates.first() else {
            let reason = res
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "no_candidates",
                status: None,
                detail: reason,
                raw_output: None,
                raw_response_json: Some(raw_json.clone()),
            }
            .into());
        };

        let text = candidate
            .content
            .as_ref()
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "empty",
                status: None,
                detail: format!(
                    "empty response text (finish_reason={})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
                raw_output: Some(text),
                raw_response_json: Some(raw_json.clone()),
            }
            .into());
        }

        Ok(text.trim().to_string())
    }
}

fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
        return diag.is_transient();
    }
    retry::is_transient_http(err)
}

#[async_trait::async_trait]
impl SummaryClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_summary(&self, summary: &Summary, website: &str) -> anyhow::Result<String> {
        tracing::info!(website, model = %self.model, "generating AI summary");

        let req = self.request(
            Some(prompts::system_prompt()),
            prompts::summary_prompt(summary, website, self.timezone),
            self.max_output_tokens,
        );
        let (raw_json, res) = self.generate_with_retry(req).await?;

        if let Some(candidate) = res.candidates.first() {
            if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
                tracing::warn!(
                    max_output_tokens = self.max_output_tokens,
                    "Gemini finish_reason=MAX_TOKENS; summary may be truncated"
                );
            }
        }

        let text = Self::response_text(&res, &raw_json)?;
        tracing::info!(chars = text.chars().count(), "AI summary generated");
        Ok(text)
    }

    async fn test_connection(&self) -> anyhow::Result<()> {
        let mut req = self.request(
            None,
            prompts::CONNECTION_TEST_PROMPT.to_string(),
            CONNECTION_TEST_MAX_TOKENS,
        );
        req.generation_config.temperature = None;
        self.generate_content(&req)
            .await
            .context("Gemini connection test failed")?;
        tracing::info!(model = %self.model, "Gemini connection test successful");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient {
            http: reqwest::Client::new(),
            api_key: "key".to_string(),
            base_url: "https://example.test/".to_string(),
            model: "gemini-2.5-flash".to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timezone: Tz::UTC,
            retry: RetryPolicy::api(),
        }
    }

    fn parse(v: serde_json::Value) -> (serde_json::Value, GenerateContentResponse) {
        let parsed = serde_json::from_value(v.clone()).unwrap();
        (v, parsed)
    }

    #[test]
    fn builds_model_url() {
        assert_eq!(
            client().url(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn serializes_request_with_system_instruction() {
        let req = client().request(Some("sys".to_string()), "hello".to_string(), 1000);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "systemInstruction": {"parts": [{"text": "sys"}]},
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                "generationConfig": {"temperature": 0.7, "maxOutputTokens": 1000},
            })
        );
    }

    #[test]
    fn joins_candidate_parts() {
        let (raw, res) = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Traffic grew. "}, {"text": "Keep going.\n"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 42}
        }));
        assert_eq!(
            GeminiClient::response_text(&res, &raw).unwrap(),
            "Traffic grew. Keep going."
        );
    }

    #[test]
    fn empty_text_is_a_diagnostics_error() {
        let (raw, res) = parse(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        }));
        let err = GeminiClient::response_text(&res, &raw).unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "empty");
        assert!(diag.detail.contains("SAFETY"));
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let (raw, res) = parse(json!({"promptFeedback": {"blockReason": "OTHER"}}));
        let err = GeminiClient::response_text(&res, &raw).unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "no_candidates");
        assert_eq!(diag.detail, "OTHER");
    }

    #[test]
    fn retries_only_transient_failures() {
        let diag = |status| -> anyhow::Error {
            LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "http",
                status: Some(status),
                detail: String::new(),
                raw_output: None,
                raw_response_json: None,
            }
            .into()
        };
        assert!(is_retryable(&diag(429)));
        assert!(is_retryable(&diag(503)));
        assert!(!is_retryable(&diag(401)));
        assert!(!is_retryable(&anyhow::anyhow!("decode failure")));
    }
}
