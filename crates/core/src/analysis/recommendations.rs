use crate::analysis::{
    DIRECT_TRAFFIC_SHARE, HIGH_BOUNCE_RATE, LOW_CONVERSION_RATE, MIN_SESSIONS_FOR_CONVERSION,
    TOP_SOURCES, WEAK_ENGAGEMENT_RECOMMENDATION_RATE,
};
use crate::domain::snapshot::AnalyticsSnapshot;
use crate::domain::summary::{MetricChange, Trend};

pub const REVIEW_CONTENT: &str =
    "Consider reviewing recent content changes or SEO optimization";
pub const REDUCE_BOUNCE: &str =
    "High bounce rate detected - consider improving page load times and content relevance";
pub const IMPROVE_ENGAGEMENT: &str =
    "Low engagement rate - consider improving content quality, page load speed, and user experience";
pub const REVIEW_CALLS_TO_ACTION: &str =
    "Low conversion rate - review call-to-action placement and form accessibility";
pub const DIVERSIFY_SOURCES: &str =
    "High direct traffic - consider diversifying sources through SEO, social media, and content marketing";

/// Action items for the period, in a fixed order. Rules are independent of each other.
pub fn generate_recommendations(
    current: &AnalyticsSnapshot,
    views_change: &MetricChange,
    bounce_rate_change: Option<&MetricChange>,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if views_change.trend == Trend::Down {
        recommendations.push(REVIEW_CONTENT.to_string());
    }

    if bounce_rate_change.is_some_and(|b| b.current > HIGH_BOUNCE_RATE) {
        recommendations.push(REDUCE_BOUNCE.to_string());
    }

    if current
        .engagement_rate()
        .is_some_and(|rate| rate < WEAK_ENGAGEMENT_RECOMMENDATION_RATE)
    {
        recommendations.push(IMPROVE_ENGAGEMENT.to_string());
    }

    // Small samples make the conversion rate meaningless.
    if current.conversion_rate() < LOW_CONVERSION_RATE
        && current.audience.sessions > MIN_SESSIONS_FOR_CONVERSION
    {
        recommendations.push(REVIEW_CALLS_TO_ACTION.to_string());
    }

    let direct_users: u64 = current
        .acquisition
        .iter()
        .take(TOP_SOURCES)
        .filter(|s| s.source.to_lowercase().contains("direct"))
        .map(|s| s.users)
        .sum();
    if direct_users as f64 > current.audience.total_users as f64 * DIRECT_TRAFFIC_SHARE {
        recommendations.push(DIVERSIFY_SOURCES.to_string());
    }

    recommendations
}
