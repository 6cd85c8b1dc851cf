use anyhow::Context;
use chrono::{DateTime, Utc};
use gareport_core::analysis::assemble;
use gareport_core::domain::summary::Summary;
use gareport_core::email::ReportMailer;
use gareport_core::ingest::provider::AnalyticsProvider;
use gareport_core::llm::error::LlmDiagnosticsError;
use gareport_core::llm::SummaryClient;
use gareport_core::time::schedule::{previous_window, report_window};

pub struct ReportPipeline {
    pub website: String,
    pub interval_days: u32,
    pub compare_previous_period: bool,
    pub provider: Box<dyn AnalyticsProvider>,
    pub summarizer: Box<dyn SummaryClient>,
    pub mailer: Box<dyn ReportMailer>,
}

impl ReportPipeline {
    /// One full report cycle. Failures are reported to Sentry and, when configured,
    /// by email before being returned.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> anyhow::Result<Summary> {
        tracing::info!(website = %self.website, "starting analytics report generation");
        match self.generate_report(now).await {
            Ok(summary) => {
                tracing::info!(website = %self.website, "analytics report generation completed");
                Ok(summary)
            }
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %format!("{err:#}"), "report generation failed");

                let details = format!("{err:?}");
                match self
                    .mailer
                    .send_error_notification(&format!("{err:#}"), Some(&details))
                    .await
                {
                    Ok(_) => {}
                    Err(notify_err) => {
                        tracing::warn!(error = %notify_err, "failed to send error notification")
                    }
                }
                Err(err)
            }
        }
    }

    pub async fn generate_report(&self, now: DateTime<Utc>) -> anyhow::Result<Summary> {
        let (start, end) = report_window(now, self.interval_days);

        let current = self
            .provider
            .fetch_snapshot(start, end)
            .await
            .context("failed to fetch analytics for the report period")?;

        let previous = if self.compare_previous_period {
            let (prev_start, prev_end) = previous_window(start, end);
            match self.provider.fetch_snapshot(prev_start, prev_end).await {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    tracing::warn!(
                        error = %format!("{err:#}"),
                        "previous period unavailable; reporting without comparison"
                    );
                    None
                }
            }
        } else {
            None
        };

        let summary = assemble(&current, previous.as_ref());

        let ai_summary = match self.summarizer.generate_summary(&summary, &self.website).await {
            Ok(text) => text,
            Err(err) => {
                if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                    tracing::warn!(
                        provider = ?diag.provider,
                        stage = diag.stage,
                        status = ?diag.status,
                        detail = %diag.detail,
                        "AI summary failed; using rule-based summary"
                    );
                } else {
                    tracing::warn!(
                        error = %format!("{err:#}"),
                        "AI summary failed; using rule-based summary"
                    );
                }
                fallback_summary(&summary)
            }
        };

        self.mailer
            .send_report(&summary, &ai_summary, &self.website)
            .await
            .context("failed to send report email")?;

        Ok(summary)
    }
}

/// Plain rendering of the rule-based findings, used when no AI text is available.
pub fn fallback_summary(summary: &Summary) -> String {
    let mut out = Vec::new();
    if summary.key_insights.is_empty() {
        out.push("No notable changes this period.".to_string());
    } else {
        out.push("Key findings:".to_string());
        out.extend(summary.key_insights.iter().map(|s| format!("- {s}")));
    }
    if !summary.recommendations.is_empty() {
        out.push(String::new());
        out.push("Recommendations:".to_string());
        out.extend(summary.recommendations.iter().map(|s| format!("- {s}")));
    }
    out.join("\n")
}
