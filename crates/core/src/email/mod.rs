pub mod smtp;
pub mod templates;

use crate::domain::summary::Summary;

#[async_trait::async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send_report(
        &self,
        summary: &Summary,
        ai_summary: &str,
        website: &str,
    ) -> anyhow::Result<()>;

    /// Returns `false` without sending when no error recipient is configured.
    async fn send_error_notification(
        &self,
        message: &str,
        details: Option<&str>,
    ) -> anyhow::Result<bool>;

    async fn test_connection(&self) -> anyhow::Result<()>;
}
