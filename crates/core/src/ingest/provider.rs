use crate::domain::snapshot::AnalyticsSnapshot;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Source of per-period analytics snapshots.
#[async_trait::async_trait]
pub trait AnalyticsProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_snapshot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AnalyticsSnapshot>;

    /// Cheap request proving credentials and property access work.
    async fn test_connection(&self) -> Result<()>;
}
