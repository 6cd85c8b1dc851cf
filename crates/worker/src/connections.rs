use gareport_core::email::ReportMailer;
use gareport_core::ingest::provider::AnalyticsProvider;
use gareport_core::llm::SummaryClient;

/// Check every external collaborator and report which ones work.
/// Returns `true` only when all of them do.
pub async fn check_all(
    provider: &dyn AnalyticsProvider,
    summarizer: &dyn SummaryClient,
    mailer: &dyn ReportMailer,
) -> bool {
    let results = [
        (provider.provider_name(), provider.test_connection().await),
        ("ai", summarizer.test_connection().await),
        ("smtp", mailer.test_connection().await),
    ];

    let mut all_ok = true;
    for (name, result) in results {
        match result {
            Ok(()) => tracing::info!(service = name, "connection OK"),
            Err(err) => {
                all_ok = false;
                tracing::error!(service = name, error = %format!("{err:#}"), "connection FAILED");
            }
        }
    }
    all_ok
}
