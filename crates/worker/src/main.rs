use anyhow::Context;
use clap::Parser;
use gareport_core::config::Settings;
use gareport_core::email::smtp::SmtpMailer;
use gareport_core::ingest::ga4::Ga4Client;
use gareport_core::llm::gemini::GeminiClient;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod connections;
mod pipeline;
mod scheduler;
#[cfg(test)]
mod test_support;

#[derive(Debug, Parser)]
#[command(name = "gareport_worker", about = "Scheduled Google Analytics email reports")]
struct Args {
    /// Generate and send one report, then exit.
    #[arg(long)]
    run_once: bool,

    /// Check analytics, AI and SMTP connectivity, then exit.
    #[arg(long)]
    test: bool,

    /// In scheduler mode, send a report right away before waiting for the first slot.
    #[arg(long)]
    run_immediately: bool,

    /// Log filter (e.g. `debug`, `gareport_core=trace`). Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    let filter = match args.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let website = settings.require_target_website()?.to_string();
    tracing::info!(%website, "analytics reporter starting");

    let pipeline = pipeline::ReportPipeline {
        website,
        interval_days: settings.report_interval_days,
        compare_previous_period: settings.compare_previous_period,
        provider: Box::new(Ga4Client::from_settings(&settings)?),
        summarizer: Box::new(GeminiClient::from_settings(&settings)?),
        mailer: Box::new(SmtpMailer::from_settings(&settings)?),
    };

    if args.test {
        let ok = connections::check_all(
            &*pipeline.provider,
            &*pipeline.summarizer,
            &*pipeline.mailer,
        )
        .await;
        if !ok {
            tracing::error!("some connection tests failed");
            return Ok(ExitCode::FAILURE);
        }
        tracing::info!("all connection tests passed");
        return Ok(ExitCode::SUCCESS);
    }

    if args.run_once {
        return Ok(match pipeline.run_cycle(chrono::Utc::now()).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        });
    }

    scheduler::run(
        &pipeline,
        settings.report_time,
        settings.timezone,
        args.run_immediately,
    )
    .await?;
    Ok(ExitCode::SUCCESS)
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
