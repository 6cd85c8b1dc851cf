use crate::domain::summary::{format_count, MetricChange, Summary};
use crate::time::schedule::local_date;
use chrono_tz::Tz;

const PROMPT_SOURCES: usize = 3;
const PROMPT_LOCATIONS: usize = 3;
const PROMPT_INSIGHTS: usize = 3;
const PROMPT_RECOMMENDATIONS: usize = 2;

pub const CONNECTION_TEST_PROMPT: &str = "Test connection. Reply with 'OK'.";

pub fn system_prompt() -> String {
    [
        "You are a web analytics consultant writing for busy professionals.",
        "Your reports are extremely brief, direct and focused on actionable findings.",
        "No filler, no repeated information, only key findings and concrete recommendations.",
    ]
    .join("\n")
}

/// `(↑ +25.0% vs previous period)`, or empty when there is nothing to compare.
pub fn format_trend(change: &MetricChange) -> String {
    match change.change_percent {
        Some(pct) => {
            let sign = if pct > 0.0 { "+" } else { "" };
            format!(
                "({} {sign}{pct:.1}% vs previous period)",
                change.trend.arrow()
            )
        }
        None => String::new(),
    }
}

fn metric_line(name: &str, change: &MetricChange) -> String {
    format!(
        "- {name}: {} {}",
        format_count(change.current),
        format_trend(change)
    )
    .trim_end()
    .to_string()
}

fn bullets<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let lines: Vec<String> = items.map(|s| format!("- {s}")).collect();
    if lines.is_empty() {
        "- (none)".to_string()
    } else {
        lines.join("\n")
    }
}

pub fn summary_prompt(summary: &Summary, website: &str, tz: Tz) -> String {
    let sources = summary
        .top_sources
        .iter()
        .take(PROMPT_SOURCES)
        .map(|s| s.source.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let locations = summary
        .geographic_breakdown
        .iter()
        .take(PROMPT_LOCATIONS)
        .map(|g| g.location.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Write a very brief analytics report for {website} (period: {start} - {end}).\n\n\
DATA:\n\
{views}\n\
{visitors}\n\
- Top sources: {sources}\n\
- Top locations: {locations}\n\n\
KEY INSIGHTS:\n\
{insights}\n\n\
RECOMMENDATIONS:\n\
{recommendations}\n\n\
REQUIREMENTS:\n\
- No heading; open with 1-2 sentences on the overall state\n\
- Then a \"## Key findings\" section with 1-3 bullets, one sentence each\n\
- Then a \"## Recommendations\" section with 1-2 bullets, one sentence each\n\
- At most 150 words in total\n\
- Professional, direct tone without filler\n\
- No tables and no repeating metrics the email already shows\n\
- Focus on what matters for decisions",
        start = local_date(summary.period_start, tz).format("%b %d"),
        end = local_date(summary.period_end, tz).format("%b %d, %Y"),
        views = metric_line("Views", &summary.total_views),
        visitors = metric_line("Visitors", &summary.unique_visitors),
        insights = bullets(summary.key_insights.iter().take(PROMPT_INSIGHTS)),
        recommendations = bullets(summary.recommendations.iter().take(PROMPT_RECOMMENDATIONS)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compare;
    use crate::analysis::test_support::sample_summary;

    #[test]
    fn trend_annotation() {
        assert_eq!(
            format_trend(&compare(125.0, Some(100.0))),
            "(↑ +25.0% vs previous period)"
        );
        assert_eq!(
            format_trend(&compare(80.0, Some(100.0))),
            "(↓ -20.0% vs previous period)"
        );
        assert_eq!(
            format_trend(&compare(102.0, Some(100.0))),
            "(→ +2.0% vs previous period)"
        );
        assert_eq!(
            format_trend(&compare(100.0, Some(100.0))),
            "(→ 0.0% vs previous period)"
        );
        assert_eq!(format_trend(&compare(100.0, None)), "");
    }

    #[test]
    fn prompt_carries_metrics_and_heads_of_lists() {
        let summary = sample_summary();
        let prompt = summary_prompt(&summary, "example.com", Tz::UTC);

        assert!(prompt.starts_with(
            "Write a very brief analytics report for example.com (period: Jan 01 - Jan 31, 2024)."
        ));
        assert!(prompt.contains("- Views: 1,000 (↑ +11.1% vs previous period)\n"));
        assert!(prompt.contains("- Visitors: 1,250 (↑ +25.0% vs previous period)\n"));
        assert!(prompt.contains("- Top sources: google/organic, (direct)/(none), linkedin.com/referral\n"));
        assert!(prompt.contains("- Top locations: Bratislava, Slovakia, Vienna, Austria\n"));
        assert!(prompt.contains("- Traffic increased by 11.1% compared to the previous period\n"));
        assert!(prompt.contains("RECOMMENDATIONS:\n- (none)\n"));
    }

    #[test]
    fn prompt_period_is_in_local_dates() {
        use chrono::{TimeZone, Utc};

        let mut summary = sample_summary();
        summary.period_end = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        let prompt = summary_prompt(&summary, "example.com", Tz::Europe__Bratislava);
        assert!(prompt.contains("(period: Jan 01 - Feb 01, 2024)"));
    }

    #[test]
    fn prompt_limits_insights_and_recommendations() {
        let mut summary = sample_summary();
        summary.key_insights = (1..=5).map(|i| format!("insight {i}")).collect();
        summary.recommendations = (1..=4).map(|i| format!("rec {i}")).collect();
        let prompt = summary_prompt(&summary, "example.com", Tz::UTC);

        assert!(prompt.contains("- insight 3\n"));
        assert!(!prompt.contains("insight 4"));
        assert!(prompt.contains("- rec 2\n"));
        assert!(!prompt.contains("rec 3"));
    }

    #[test]
    fn metric_without_comparison_has_no_trailing_space() {
        let mut summary = sample_summary();
        summary.total_views = compare(42.0, None);
        let prompt = summary_prompt(&summary, "example.com", Tz::UTC);
        assert!(prompt.contains("- Views: 42\n"));
    }
}
