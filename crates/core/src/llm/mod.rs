pub mod error;
pub mod gemini;
pub mod prompts;

use crate::domain::summary::Summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

/// Turns an assembled [`Summary`] into short prose for the report email.
#[async_trait::async_trait]
pub trait SummaryClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_summary(&self, summary: &Summary, website: &str) -> anyhow::Result<String>;

    async fn test_connection(&self) -> anyhow::Result<()>;
}
