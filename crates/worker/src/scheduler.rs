use crate::pipeline::ReportPipeline;
use anyhow::Context;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use gareport_core::time::schedule::next_run_after;

/// Run a report at `at` local time every day until Ctrl-C.
///
/// A failed cycle is already logged and reported by the pipeline; the loop carries on.
pub async fn run(
    pipeline: &ReportPipeline,
    at: NaiveTime,
    tz: Tz,
    run_immediately: bool,
) -> anyhow::Result<()> {
    tracing::info!(
        report_time = %at.format("%H:%M"),
        timezone = %tz,
        interval_days = pipeline.interval_days,
        "scheduler started"
    );

    if run_immediately {
        scheduled_cycle(pipeline, Utc::now()).await;
    }

    loop {
        let now = Utc::now();
        let next = next_run_after(now, at, tz);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next_run = %next.with_timezone(&tz), ?wait, "next report scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            res = tokio::signal::ctrl_c() => {
                res.context("failed to listen for shutdown signal")?;
                tracing::info!("shutdown requested; scheduler stopped");
                return Ok(());
            }
        }

        scheduled_cycle(pipeline, Utc::now()).await;
    }
}

/// Runs one cycle for the loop. The failure itself was already captured by the pipeline.
async fn scheduled_cycle(pipeline: &ReportPipeline, now: DateTime<Utc>) -> bool {
    match pipeline.run_cycle(now).await {
        Ok(_) => true,
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "report cycle failed; scheduler continues");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pipeline, Calls};
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn failed_cycle_does_not_stop_the_next_one() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 7, 0, 0).unwrap();

        let calls = Arc::new(Mutex::new(Calls::default()));
        let failing = pipeline(&calls, true, false, false, false);
        assert!(!scheduled_cycle(&failing, now).await);
        assert!(!scheduled_cycle(&failing, now).await);
        {
            let calls = calls.lock().unwrap();
            assert_eq!(calls.fetched.len(), 2);
            assert_eq!(calls.errors.len(), 2);
        }

        let calls = Arc::new(Mutex::new(Calls::default()));
        let healthy = pipeline(&calls, false, false, false, false);
        assert!(scheduled_cycle(&healthy, now).await);
        assert_eq!(calls.lock().unwrap().reports.len(), 1);
    }
}
