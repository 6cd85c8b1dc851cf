use crate::analysis::{
    STRONG_ENGAGEMENT_RATE, TOP_LOCATIONS, TOP_SOURCES, WEAK_ENGAGEMENT_RATE,
};
use crate::domain::snapshot::AnalyticsSnapshot;
use crate::domain::summary::{MetricChange, Trend};

/// Short observations about the period, in a fixed order:
/// traffic trend, engagement, conversions, top source, top location.
///
/// Every rule is optional; missing data skips the rule.
pub fn generate_insights(
    current: &AnalyticsSnapshot,
    _previous: Option<&AnalyticsSnapshot>,
    views_change: &MetricChange,
    _visitors_change: &MetricChange,
) -> Vec<String> {
    let mut insights = Vec::new();

    match (views_change.trend, views_change.change_percent) {
        (Trend::Up, Some(pct)) => insights.push(format!(
            "Traffic increased by {pct:.1}% compared to the previous period"
        )),
        (Trend::Down, Some(pct)) => insights.push(format!(
            "Traffic decreased by {:.1}% compared to the previous period",
            pct.abs()
        )),
        _ => {}
    }

    if let Some(rate) = current.engagement_rate() {
        if rate > STRONG_ENGAGEMENT_RATE {
            insights.push(format!(
                "Strong engagement rate of {rate:.1}% indicates visitors are finding content valuable"
            ));
        } else if rate < WEAK_ENGAGEMENT_RATE {
            insights.push(format!(
                "Low engagement rate of {rate:.1}% suggests content may need improvement"
            ));
        }
    }

    let conversions = current.total_conversions();
    if conversions > 0 {
        insights.push(format!(
            "Total conversions: {conversions} (rate: {:.2}%)",
            current.conversion_rate()
        ));
    }

    if let Some(top) = current.acquisition.iter().take(TOP_SOURCES).next() {
        insights.push(format!(
            "Primary traffic source: {} ({:.1}% of users)",
            top.label(),
            top.percentage
        ));
    }

    if let Some(top) = current.geographic.iter().take(TOP_LOCATIONS).next() {
        insights.push(format!(
            "Top location: {} ({:.1}% of users)",
            top.label(),
            top.percentage
        ));
    }

    insights
}
