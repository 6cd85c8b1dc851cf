use crate::domain::summary::{MetricChange, Trend};

/// Percentage change beyond which a metric counts as moving. Exclusive on both sides.
pub const TREND_THRESHOLD_PERCENT: f64 = 5.0;

/// Compare a metric against its value in the previous period.
///
/// A missing or zero baseline yields no change figures and a stable trend. Any other
/// numeric input is computed as-is; callers own range validation.
pub fn compare(current: f64, previous: Option<f64>) -> MetricChange {
    let (change, change_percent) = match previous {
        Some(prev) if prev != 0.0 => {
            let change = current - prev;
            (Some(change), Some(round2(change / prev * 100.0)))
        }
        _ => (None, None),
    };

    MetricChange {
        current,
        previous,
        change,
        change_percent,
        trend: classify(change_percent),
    }
}

fn classify(change_percent: Option<f64>) -> Trend {
    match change_percent {
        Some(p) if p > TREND_THRESHOLD_PERCENT => Trend::Up,
        Some(p) if p < -TREND_THRESHOLD_PERCENT => Trend::Down,
        _ => Trend::Stable,
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
