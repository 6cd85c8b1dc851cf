use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw analytics figures for one reporting period, as fetched from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub audience: AudienceMetrics,
    /// Absent when the provider returned no engagement rows for the period.
    pub engagement: Option<EngagementMetrics>,
    #[serde(default)]
    pub conversions: ConversionMetrics,
    /// Ranked by users, descending.
    #[serde(default)]
    pub acquisition: Vec<AcquisitionSource>,
    /// Ranked by users, descending.
    #[serde(default)]
    pub geographic: Vec<GeographicEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceMetrics {
    pub total_users: u64,
    pub new_users: u64,
    pub sessions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// Seconds per session.
    pub average_engagement_time: f64,
    pub engaged_sessions: u64,
    /// Percentage of engaged sessions, 0..=100.
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMetrics {
    pub form_submits: u64,
    pub email_clicks: u64,
    pub phone_clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionSource {
    pub source: String,
    pub medium: String,
    pub users: u64,
    /// Share of all users for the period, not of the listed entries.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographicEntry {
    pub city: String,
    pub country: String,
    pub users: u64,
    /// Share of all users for the period, not of the listed entries.
    pub percentage: f64,
}

impl AnalyticsSnapshot {
    pub fn engagement_rate(&self) -> Option<f64> {
        self.engagement.map(|e| e.engagement_rate)
    }

    pub fn average_engagement_time(&self) -> Option<f64> {
        self.engagement.map(|e| e.average_engagement_time)
    }

    pub fn total_conversions(&self) -> u64 {
        self.conversions.total()
    }

    /// Conversions as a percentage of sessions; 0 when there were no sessions.
    pub fn conversion_rate(&self) -> f64 {
        if self.audience.sessions == 0 {
            return 0.0;
        }
        self.total_conversions() as f64 / self.audience.sessions as f64 * 100.0
    }
}

impl ConversionMetrics {
    pub fn total(&self) -> u64 {
        self.form_submits + self.email_clicks + self.phone_clicks
    }
}

impl AcquisitionSource {
    pub fn label(&self) -> String {
        format!("{}/{}", self.source, self.medium)
    }
}

impl GeographicEntry {
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(sessions: u64, conversions: ConversionMetrics) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
            audience: AudienceMetrics {
                total_users: 10,
                new_users: 5,
                sessions,
            },
            engagement: None,
            conversions,
            acquisition: Vec::new(),
            geographic: Vec::new(),
        }
    }

    #[test]
    fn conversion_totals_and_rate() {
        let s = snapshot(
            10_000,
            ConversionMetrics {
                form_submits: 50,
                email_clicks: 30,
                phone_clicks: 20,
            },
        );
        assert_eq!(s.total_conversions(), 100);
        assert_eq!(s.conversion_rate(), 1.0);
    }

    #[test]
    fn conversion_rate_is_zero_without_sessions() {
        let s = snapshot(
            0,
            ConversionMetrics {
                form_submits: 3,
                ..Default::default()
            },
        );
        assert_eq!(s.conversion_rate(), 0.0);
    }

    #[test]
    fn deserializes_with_missing_breakdowns() {
        let v = serde_json::json!({
            "start": "2024-01-01T00:00:00Z",
            "end": "2024-01-31T00:00:00Z",
            "audience": {"total_users": 1, "new_users": 1, "sessions": 2},
            "engagement": null,
        });
        let s: AnalyticsSnapshot = serde_json::from_value(v).unwrap();
        assert!(s.acquisition.is_empty());
        assert!(s.geographic.is_empty());
        assert_eq!(s.conversions, ConversionMetrics::default());
    }
}
