use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "↑",
            Trend::Down => "↓",
            Trend::Stable => "→",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Period-over-period comparison of a single metric.
///
/// `change` and `change_percent` are only present when a non-zero previous value
/// was available; in every other case the trend is [`Trend::Stable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricChange {
    pub current: f64,
    pub previous: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub trend: Trend,
}

/// Traffic source entry as shown in the report (`source/medium`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceShare {
    pub source: String,
    pub visitors: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationShare {
    pub location: String,
    pub visitors: u64,
    pub percentage: f64,
}

/// Everything downstream collaborators need for one report cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub period_days: i64,

    pub total_views: MetricChange,
    pub unique_visitors: MetricChange,
    pub avg_session_duration: Option<MetricChange>,
    pub bounce_rate: Option<MetricChange>,
    pub total_conversions: Option<MetricChange>,
    pub conversion_rate: Option<MetricChange>,
    pub engagement_rate: Option<MetricChange>,

    pub top_sources: Vec<SourceShare>,
    pub geographic_breakdown: Vec<LocationShare>,

    pub key_insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Whole number with thousands separators, e.g. `12,345`.
pub fn format_count(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Seconds rendered as `Xm Ys`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}m {}s", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1000.0), "1,000");
        assert_eq!(format_count(1234567.4), "1,234,567");
        assert_eq!(format_count(-12345.0), "-12,345");
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_duration(0.0), "0m 0s");
        assert_eq!(format_duration(125.7), "2m 5s");
        assert_eq!(format_duration(-3.0), "0m 0s");
    }

    #[test]
    fn trend_arrows_and_names() {
        assert_eq!(Trend::Up.arrow(), "↑");
        assert_eq!(Trend::Down.to_string(), "down");
        assert_eq!(
            serde_json::to_string(&Trend::Stable).unwrap(),
            "\"stable\""
        );
    }
}
