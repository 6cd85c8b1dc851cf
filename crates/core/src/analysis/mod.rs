//! Period-over-period comparison and rule-based report content.
//!
//! Everything here is pure: no I/O, no shared state. Given the same snapshots the
//! resulting [`Summary`](crate::domain::summary::Summary) is identical.

pub mod assemble;
pub mod compare;
pub mod insights;
pub mod recommendations;

pub use assemble::assemble;
pub use compare::compare;
pub use insights::generate_insights;
pub use recommendations::generate_recommendations;

/// Acquisition entries kept in the summary.
pub const TOP_SOURCES: usize = 5;
/// Geographic entries kept in the summary.
pub const TOP_LOCATIONS: usize = 10;

pub const STRONG_ENGAGEMENT_RATE: f64 = 70.0;
pub const WEAK_ENGAGEMENT_RATE: f64 = 40.0;
pub const WEAK_ENGAGEMENT_RECOMMENDATION_RATE: f64 = 50.0;
pub const HIGH_BOUNCE_RATE: f64 = 60.0;
pub const LOW_CONVERSION_RATE: f64 = 1.0;
pub const MIN_SESSIONS_FOR_CONVERSION: u64 = 100;
/// Fraction of all users above which direct traffic is considered dominant.
pub const DIRECT_TRAFFIC_SHARE: f64 = 0.5;

#[cfg(test)]
pub(crate) mod test_support {
    use super::assemble;
    use crate::domain::snapshot::{
        AcquisitionSource, AnalyticsSnapshot, AudienceMetrics, ConversionMetrics,
        EngagementMetrics, GeographicEntry,
    };
    use crate::domain::summary::Summary;
    use chrono::{TimeZone, Utc};

    /// A neutral period: mid-range engagement, no conversions, no breakdowns.
    pub fn snapshot(sessions: u64, total_users: u64) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
            audience: AudienceMetrics {
                total_users,
                new_users: total_users / 2,
                sessions,
            },
            engagement: Some(EngagementMetrics {
                average_engagement_time: 90.0,
                engaged_sessions: sessions * 55 / 100,
                engagement_rate: 55.0,
            }),
            conversions: ConversionMetrics::default(),
            acquisition: Vec::new(),
            geographic: Vec::new(),
        }
    }

    pub fn with_engagement(mut s: AnalyticsSnapshot, rate: f64) -> AnalyticsSnapshot {
        if let Some(e) = s.engagement.as_mut() {
            e.engagement_rate = rate;
        }
        s
    }

    /// Two months of a small site with every section populated.
    pub fn sample_summary() -> Summary {
        let mut current = snapshot(1000, 1250);
        current.acquisition = vec![
            source("google", "organic", 600, 48.0),
            source("(direct)", "(none)", 400, 32.0),
            source("linkedin.com", "referral", 250, 20.0),
        ];
        current.geographic = vec![
            place("Bratislava", "Slovakia", 700, 56.0),
            place("Vienna", "Austria", 300, 24.0),
        ];
        current.conversions.form_submits = 12;
        let previous = snapshot(900, 1000);
        assemble(&current, Some(&previous))
    }

    pub fn source(source: &str, medium: &str, users: u64, percentage: f64) -> AcquisitionSource {
        AcquisitionSource {
            source: source.to_string(),
            medium: medium.to_string(),
            users,
            percentage,
        }
    }

    pub fn place(city: &str, country: &str, users: u64, percentage: f64) -> GeographicEntry {
        GeographicEntry {
            city: city.to_string(),
            country: country.to_string(),
            users,
            percentage,
        }
    }
}
