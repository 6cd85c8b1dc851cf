use crate::analysis::compare::compare;
use crate::analysis::insights::generate_insights;
use crate::analysis::recommendations::generate_recommendations;
use crate::analysis::{TOP_LOCATIONS, TOP_SOURCES};
use crate::domain::snapshot::AnalyticsSnapshot;
use crate::domain::summary::{LocationShare, MetricChange, SourceShare, Summary};

/// Build the report summary for `current`, comparing against `previous` when given.
pub fn assemble(current: &AnalyticsSnapshot, previous: Option<&AnalyticsSnapshot>) -> Summary {
    let period_days = (current.end - current.start).num_days();

    let total_views = tracked(
        "sessions",
        current.audience.sessions as f64,
        previous.map(|p| p.audience.sessions as f64),
    );
    let unique_visitors = tracked(
        "total_users",
        current.audience.total_users as f64,
        previous.map(|p| p.audience.total_users as f64),
    );
    let avg_session_duration = current.average_engagement_time().map(|c| {
        tracked(
            "avg_engagement_time",
            c,
            previous.and_then(AnalyticsSnapshot::average_engagement_time),
        )
    });

    // Bounce is the complement of engagement on both sides of the comparison.
    let bounce_rate = current.engagement_rate().map(|c| {
        tracked(
            "bounce_rate",
            100.0 - c,
            previous
                .and_then(AnalyticsSnapshot::engagement_rate)
                .map(|p| 100.0 - p),
        )
    });

    let total_conversions = Some(tracked(
        "total_conversions",
        current.total_conversions() as f64,
        previous.map(|p| p.total_conversions() as f64),
    ));
    let conversion_rate = Some(tracked(
        "conversion_rate",
        current.conversion_rate(),
        previous.map(AnalyticsSnapshot::conversion_rate),
    ));
    let engagement_rate = current.engagement_rate().map(|c| {
        tracked(
            "engagement_rate",
            c,
            previous.and_then(AnalyticsSnapshot::engagement_rate),
        )
    });

    let top_sources = current
        .acquisition
        .iter()
        .take(TOP_SOURCES)
        .map(|s| SourceShare {
            source: s.label(),
            visitors: s.users,
            percentage: s.percentage,
        })
        .collect();

    let geographic_breakdown = current
        .geographic
        .iter()
        .take(TOP_LOCATIONS)
        .map(|g| LocationShare {
            location: g.label(),
            visitors: g.users,
            percentage: g.percentage,
        })
        .collect();

    let key_insights = generate_insights(current, previous, &total_views, &unique_visitors);
    let recommendations = generate_recommendations(current, &total_views, bounce_rate.as_ref());

    tracing::debug!(
        period_days,
        insights = key_insights.len(),
        recommendations = recommendations.len(),
        has_previous = previous.is_some(),
        "summary assembled"
    );

    Summary {
        period_start: current.start,
        period_end: current.end,
        period_days,
        total_views,
        unique_visitors,
        avg_session_duration,
        bounce_rate,
        total_conversions,
        conversion_rate,
        engagement_rate,
        top_sources,
        geographic_breakdown,
        key_insights,
        recommendations,
    }
}

fn tracked(metric: &'static str, current: f64, previous: Option<f64>) -> MetricChange {
    let change = compare(current, previous);
    tracing::debug!(
        metric,
        current,
        trend = %change.trend,
        change_percent = ?change.change_percent,
        "metric compared"
    );
    change
}
