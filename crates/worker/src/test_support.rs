use crate::pipeline::ReportPipeline;
use chrono::{DateTime, Utc};
use gareport_core::domain::snapshot::{
    AnalyticsSnapshot, AudienceMetrics, ConversionMetrics, EngagementMetrics,
};
use gareport_core::domain::summary::Summary;
use gareport_core::email::ReportMailer;
use gareport_core::ingest::provider::AnalyticsProvider;
use gareport_core::llm::error::LlmDiagnosticsError;
use gareport_core::llm::{Provider, SummaryClient};
use std::sync::{Arc, Mutex};

pub fn snapshot(start: DateTime<Utc>, end: DateTime<Utc>, sessions: u64) -> AnalyticsSnapshot {
    AnalyticsSnapshot {
        start,
        end,
        audience: AudienceMetrics {
            total_users: sessions,
            new_users: sessions / 2,
            sessions,
        },
        engagement: Some(EngagementMetrics {
            average_engagement_time: 60.0,
            engaged_sessions: sessions / 2,
            engagement_rate: 50.0,
        }),
        conversions: ConversionMetrics::default(),
        acquisition: Vec::new(),
        geographic: Vec::new(),
    }
}

#[derive(Default)]
pub struct Calls {
    pub fetched: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    pub reports: Vec<String>,
    pub errors: Vec<String>,
}

/// Serves 200 sessions for the first window and 100 for any later one.
/// `fail_current` also fails the connection test.
pub struct FakeProvider {
    pub calls: Arc<Mutex<Calls>>,
    pub fail_current: bool,
    pub fail_previous: bool,
}

#[async_trait::async_trait]
impl AnalyticsProvider for FakeProvider {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_snapshot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<AnalyticsSnapshot> {
        let first = {
            let mut calls = self.calls.lock().unwrap();
            calls.fetched.push((start, end));
            calls.fetched.len() == 1
        };
        if first && self.fail_current {
            anyhow::bail!("GA4 HTTP 403: forbidden");
        }
        if !first && self.fail_previous {
            anyhow::bail!("GA4 HTTP 503: unavailable");
        }
        Ok(snapshot(start, end, if first { 200 } else { 100 }))
    }

    async fn test_connection(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail_current, "GA4 HTTP 403: forbidden");
        Ok(())
    }
}

pub struct FakeSummarizer {
    pub fail: bool,
}

#[async_trait::async_trait]
impl SummaryClient for FakeSummarizer {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_summary(&self, _summary: &Summary, website: &str) -> anyhow::Result<String> {
        if self.fail {
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "http",
                status: Some(500),
                detail: "internal".to_string(),
                raw_output: None,
                raw_response_json: None,
            }
            .into());
        }
        Ok(format!("AI prose for {website}"))
    }

    async fn test_connection(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail, "Gemini HTTP 500: internal");
        Ok(())
    }
}

pub struct FakeMailer {
    pub calls: Arc<Mutex<Calls>>,
}

#[async_trait::async_trait]
impl ReportMailer for FakeMailer {
    async fn send_report(
        &self,
        _summary: &Summary,
        ai_summary: &str,
        _website: &str,
    ) -> anyhow::Result<()> {
        self.calls.lock().unwrap().reports.push(ai_summary.to_string());
        Ok(())
    }

    async fn send_error_notification(
        &self,
        message: &str,
        _details: Option<&str>,
    ) -> anyhow::Result<bool> {
        self.calls.lock().unwrap().errors.push(message.to_string());
        Ok(true)
    }

    async fn test_connection(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn pipeline(
    calls: &Arc<Mutex<Calls>>,
    fail_current: bool,
    fail_previous: bool,
    fail_ai: bool,
    compare: bool,
) -> ReportPipeline {
    ReportPipeline {
        website: "example.com".to_string(),
        interval_days: 30,
        compare_previous_period: compare,
        provider: Box::new(FakeProvider {
            calls: calls.clone(),
            fail_current,
            fail_previous,
        }),
        summarizer: Box::new(FakeSummarizer { fail: fail_ai }),
        mailer: Box::new(FakeMailer {
            calls: calls.clone(),
        }),
    }
}
