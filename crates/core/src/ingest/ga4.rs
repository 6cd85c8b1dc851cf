use crate::analysis::compare::round2;
use crate::config::Settings;
use crate::domain::snapshot::{
    AcquisitionSource, AnalyticsSnapshot, AudienceMetrics, ConversionMetrics, EngagementMetrics,
    GeographicEntry,
};
use crate::ingest::auth::{ServiceAccountKey, TokenSource};
use crate::ingest::provider::AnalyticsProvider;
use crate::ingest::types::{RunReportRequest, RunReportResponse};
use crate::retry::{self, HttpStatusError, RetryPolicy};
use crate::time::schedule::local_date;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://analyticsdata.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Rows requested per breakdown. The summary only shows the head of each list, but
// shares are always computed against the whole population.
const SOURCES_LIMIT: i64 = 25;
const LOCATIONS_LIMIT: i64 = 50;

const NOT_SET: &str = "(not set)";

/// Google Analytics 4 Data API client for a single property.
#[derive(Debug)]
pub struct Ga4Client {
    http: reqwest::Client,
    base_url: String,
    property_id: String,
    tokens: TokenSource,
    timezone: Tz,
    retry: RetryPolicy,
}

impl Ga4Client {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let property_id = settings.require_ga_property_id()?.to_string();
        let key = ServiceAccountKey::from_settings(settings)?;

        let base_url =
            std::env::var("GA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("GA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let mut retry = RetryPolicy::api();
        if let Some(n) = std::env::var("GA_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            retry = retry.with_attempts(n);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build GA4 http client")?;

        tracing::info!(%property_id, "Google Analytics client initialized");

        Ok(Self {
            tokens: TokenSource::new(http.clone(), key),
            http,
            base_url,
            property_id,
            timezone: settings.timezone,
            retry,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/properties/{}:runReport",
            self.base_url.trim_end_matches('/'),
            self.property_id
        )
    }

    async fn run_report(&self, req: &RunReportRequest) -> Result<RunReportResponse> {
        let token = self.tokens.access_token().await?;
        let res = self
            .http
            .post(self.url())
            .bearer_auth(token)
            .json(req)
            .send()
            .await
            .context("GA4 runReport request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read GA4 runReport response")?;
        if !status.is_success() {
            return Err(HttpStatusError {
                service: "ga4",
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        serde_json::from_str::<RunReportResponse>(&text)
            .with_context(|| format!("GA4 runReport response is not valid JSON: {text}"))
    }

    async fn report(&self, what: &str, req: RunReportRequest) -> Result<RunReportResponse> {
        let req = &req;
        retry::retry(what, self.retry, retry::is_transient_http, move || {
            self.run_report(req)
        })
        .await
        .with_context(|| format!("failed to fetch {what}"))
    }

    async fn event_count(&self, base: &RunReportRequest, event: &str) -> u64 {
        let req = base
            .clone()
            .dimensions(&["eventName"])
            .metrics(&["eventCount"])
            .exact_match("eventName", event);
        let res = self
            .report("conversion events", req)
            .await
            .and_then(|r| event_count_from(&r));
        match res {
            Ok(count) => {
                tracing::debug!(event, count, "conversion event counted");
                count
            }
            Err(err) => {
                // A property without the event configured should not sink the report.
                tracing::warn!(event, error = %err, "could not fetch event; counting as 0");
                0
            }
        }
    }

    async fn fetch_conversions(&self, base: &RunReportRequest) -> ConversionMetrics {
        ConversionMetrics {
            form_submits: self.event_count(base, "form_submit").await,
            email_clicks: self.event_count(base, "email_click").await,
            phone_clicks: self.event_count(base, "phone_click").await,
        }
    }
}

#[async_trait::async_trait]
impl AnalyticsProvider for Ga4Client {
    fn provider_name(&self) -> &'static str {
        "google_analytics_4"
    }

    async fn fetch_snapshot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AnalyticsSnapshot> {
        let (start_date, end_date) = (ga_date(start, self.timezone), ga_date(end, self.timezone));
        tracing::info!(start = %start_date, end = %end_date, "fetching analytics");

        let base = RunReportRequest::new(start_date, end_date);

        let audience = audience_from(
            &self
                .report(
                    "audience metrics",
                    base.clone().metrics(&["totalUsers", "newUsers", "sessions"]),
                )
                .await?,
        )?;

        let engagement = engagement_from(
            &self
                .report(
                    "engagement metrics",
                    base.clone().metrics(&[
                        "userEngagementDuration",
                        "engagedSessions",
                        "sessions",
                    ]),
                )
                .await?,
        )?;

        let acquisition = acquisition_from(
            &self
                .report(
                    "acquisition data",
                    base.clone()
                        .dimensions(&["sessionSource", "sessionMedium"])
                        .metrics(&["totalUsers"])
                        .ranked_by("totalUsers", SOURCES_LIMIT),
                )
                .await?,
        )?;

        let conversions = self.fetch_conversions(&base).await;

        let geographic = geographic_from(
            &self
                .report(
                    "geographic data",
                    base.clone()
                        .dimensions(&["city", "country"])
                        .metrics(&["totalUsers"])
                        .ranked_by("totalUsers", LOCATIONS_LIMIT),
                )
                .await?,
        )?;

        let snapshot = AnalyticsSnapshot {
            start,
            end,
            audience,
            engagement,
            conversions,
            acquisition,
            geographic,
        };

        tracing::info!(
            users = snapshot.audience.total_users,
            sessions = snapshot.audience.sessions,
            conversions = snapshot.total_conversions(),
            "analytics fetched"
        );
        Ok(snapshot)
    }

    async fn test_connection(&self) -> Result<()> {
        let req = RunReportRequest::new("7daysAgo".to_string(), "today".to_string())
            .metrics(&["totalUsers"]);
        self.run_report(&req).await.map(|_| ())
    }
}

fn audience_from(resp: &RunReportResponse) -> Result<AudienceMetrics> {
    let Some(row) = resp.rows.first() else {
        tracing::warn!("no audience data returned from API");
        return Ok(AudienceMetrics {
            total_users: 0,
            new_users: 0,
            sessions: 0,
        });
    };
    Ok(AudienceMetrics {
        total_users: row.metric_u64(0)?,
        new_users: row.metric_u64(1)?,
        sessions: row.metric_u64(2)?,
    })
}

fn engagement_from(resp: &RunReportResponse) -> Result<Option<EngagementMetrics>> {
    let Some(row) = resp.rows.first() else {
        tracing::warn!("no engagement data returned from API");
        return Ok(None);
    };
    let total_duration = row.metric_f64(0)?;
    let engaged_sessions = row.metric_u64(1)?;
    let sessions = row.metric_u64(2)?;
    if sessions == 0 {
        return Ok(None);
    }
    Ok(Some(EngagementMetrics {
        average_engagement_time: total_duration / sessions as f64,
        engaged_sessions,
        engagement_rate: engaged_sessions as f64 / sessions as f64 * 100.0,
    }))
}

/// Users across the whole report: the TOTAL aggregation when present, else the row sum.
fn population(resp: &RunReportResponse) -> Result<f64> {
    if let Some(total) = resp.totals.first() {
        let v = total.metric_f64(0)?;
        if v > 0.0 {
            return Ok(v);
        }
    }
    resp.rows
        .iter()
        .map(|r| r.metric_f64(0))
        .sum::<Result<f64>>()
}

fn share(users: u64, population: f64) -> f64 {
    if population <= 0.0 {
        return 0.0;
    }
    round2(users as f64 / population * 100.0)
}

fn acquisition_from(resp: &RunReportResponse) -> Result<Vec<AcquisitionSource>> {
    if resp.rows.is_empty() {
        tracing::warn!("no acquisition data returned from API");
        return Ok(Vec::new());
    }
    let total = population(resp)?;
    resp.rows
        .iter()
        .map(|row| {
            let users = row.metric_u64(0)?;
            Ok(AcquisitionSource {
                source: row.dimension(0).to_string(),
                medium: row.dimension(1).to_string(),
                users,
                percentage: share(users, total),
            })
        })
        .collect()
}

fn geographic_from(resp: &RunReportResponse) -> Result<Vec<GeographicEntry>> {
    if resp.rows.is_empty() {
        tracing::warn!("no geographic data returned from API");
        return Ok(Vec::new());
    }
    let total = population(resp)?;
    let mut out = Vec::with_capacity(resp.rows.len());
    for row in &resp.rows {
        let (city, country) = (row.dimension(0), row.dimension(1));
        // Unknown locations still count toward the population.
        if city == NOT_SET || country == NOT_SET {
            continue;
        }
        let users = row.metric_u64(0)?;
        out.push(GeographicEntry {
            city: city.to_string(),
            country: country.to_string(),
            users,
            percentage: share(users, total),
        });
    }
    Ok(out)
}

fn event_count_from(resp: &RunReportResponse) -> Result<u64> {
    match resp.rows.first() {
        Some(row) => row.metric_u64(0),
        None => Ok(0),
    }
}

/// `YYYY-MM-DD` as the property's reporting day in `tz`.
fn ga_date(at: DateTime<Utc>, tz: Tz) -> String {
    local_date(at, tz).format("%Y-%m-%d").to_string()
}
