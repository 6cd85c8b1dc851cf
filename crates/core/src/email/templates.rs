//! Plain-text and HTML bodies for the report and error emails.

use crate::domain::summary::{format_count, format_duration, MetricChange, Summary, Trend};
use crate::time::schedule::local_date;
use chrono::DateTime;
use chrono_tz::Tz;

const RULE_HEAVY: &str = "═══════════════════════════════════════════════════════════";
const RULE_LIGHT: &str = "───────────────────────────────────────────────────────────";
const FOOTER_TAGLINE: &str = "Automated Analytics Report • Powered by Google Analytics & AI";

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn signed_percent(pct: f64) -> String {
    let sign = if pct > 0.0 { "+" } else { "" };
    format!("{sign}{pct:.1}%")
}

pub fn trend_text(change: &MetricChange) -> String {
    match change.change_percent {
        Some(pct) => format!(
            "  {} {} compared to previous period",
            change.trend.arrow(),
            signed_percent(pct)
        ),
        None => "  (No comparison data available)".to_string(),
    }
}

pub fn trend_html(change: &MetricChange) -> String {
    let Some(pct) = change.change_percent else {
        return r#"<span style="color: #6b7280;">No comparison data</span>"#.to_string();
    };
    let color = match change.trend {
        Trend::Up => "#10b981",
        Trend::Down => "#ef4444",
        Trend::Stable => "#6b7280",
    };
    format!(
        r#"<span style="color: {color}; font-weight: 500;">{} {} vs previous</span>"#,
        change.trend.arrow(),
        signed_percent(pct)
    )
}

/// Label and rendered value for each optional metric that is present.
fn secondary_metrics(summary: &Summary) -> Vec<(&'static str, String, &MetricChange)> {
    let mut out = Vec::new();
    if let Some(m) = &summary.avg_session_duration {
        out.push(("Avg. Engagement Time", format_duration(m.current), m));
    }
    if let Some(m) = &summary.engagement_rate {
        out.push(("Engagement Rate", format!("{:.1}%", m.current), m));
    }
    if let Some(m) = &summary.bounce_rate {
        out.push(("Bounce Rate", format!("{:.1}%", m.current), m));
    }
    if let Some(m) = &summary.total_conversions {
        out.push(("Conversions", format_count(m.current), m));
    }
    if let Some(m) = &summary.conversion_rate {
        out.push(("Conversion Rate", format!("{:.2}%", m.current), m));
    }
    out
}

fn period_label(summary: &Summary, tz: Tz) -> String {
    format!(
        "{} - {}",
        local_date(summary.period_start, tz).format("%B %d, %Y"),
        local_date(summary.period_end, tz).format("%B %d, %Y")
    )
}

fn generated_label(generated_at: &DateTime<Tz>) -> String {
    generated_at.format("%B %d, %Y at %I:%M %p %Z").to_string()
}

fn section(out: &mut Vec<String>, title: &str) {
    out.push(RULE_LIGHT.to_string());
    out.push(title.to_string());
    out.push(RULE_LIGHT.to_string());
    out.push(String::new());
}

pub fn report_plain(
    summary: &Summary,
    ai_summary: &str,
    website: &str,
    generated_at: &DateTime<Tz>,
) -> String {
    let mut out = vec![
        RULE_HEAVY.to_string(),
        format!("  ANALYTICS REPORT - {}", website.to_uppercase()),
        RULE_HEAVY.to_string(),
        String::new(),
        format!("Period: {}", period_label(summary, generated_at.timezone())),
        format!("Duration: {} days", summary.period_days),
        String::new(),
    ];

    section(&mut out, "KEY METRICS");
    out.push(format!(
        "Total Sessions: {}",
        format_count(summary.total_views.current)
    ));
    out.push(trend_text(&summary.total_views));
    out.push(String::new());
    out.push(format!(
        "Unique Visitors: {}",
        format_count(summary.unique_visitors.current)
    ));
    out.push(trend_text(&summary.unique_visitors));
    out.push(String::new());
    for (label, value, change) in secondary_metrics(summary) {
        out.push(format!("{label}: {value}"));
        out.push(trend_text(change));
    }
    out.push(String::new());

    section(&mut out, "AI-POWERED INSIGHTS");
    out.push(ai_summary.trim().to_string());
    out.push(String::new());

    if !summary.top_sources.is_empty() {
        section(&mut out, "TRAFFIC SOURCES");
        for (i, s) in summary.top_sources.iter().enumerate() {
            out.push(format!("  {}. {}", i + 1, s.source));
            out.push(format!(
                "     Visitors: {} ({:.1}%)",
                format_count(s.visitors as f64),
                s.percentage
            ));
        }
        out.push(String::new());
    }

    if !summary.geographic_breakdown.is_empty() {
        section(&mut out, "TOP LOCATIONS");
        for (i, g) in summary.geographic_breakdown.iter().enumerate() {
            out.push(format!("  {}. {}", i + 1, g.location));
            out.push(format!(
                "     Visitors: {} ({:.1}%)",
                format_count(g.visitors as f64),
                g.percentage
            ));
        }
        out.push(String::new());
    }

    if !summary.key_insights.is_empty() {
        section(&mut out, "KEY INSIGHTS");
        out.extend(summary.key_insights.iter().map(|s| format!("  • {s}")));
        out.push(String::new());
    }

    if !summary.recommendations.is_empty() {
        section(&mut out, "RECOMMENDATIONS");
        out.extend(summary.recommendations.iter().map(|s| format!("  • {s}")));
        out.push(String::new());
    }

    out.push(RULE_LIGHT.to_string());
    out.push(String::new());
    out.push(format!("Generated on {}", generated_label(generated_at)));
    out.push(FOOTER_TAGLINE.to_string());
    out.push(String::new());
    out.push(RULE_HEAVY.to_string());

    out.join("\n")
}

const H2: &str = "margin: 0 0 15px 0; font-size: 20px; color: #1f2937;";
const TH_LEFT: &str = "padding: 12px 8px; text-align: left; font-size: 12px; font-weight: 600; color: #6b7280; text-transform: uppercase;";
const TH_RIGHT: &str = "padding: 12px 8px; text-align: right; font-size: 12px; font-weight: 600; color: #6b7280; text-transform: uppercase;";
const TD_LEFT: &str = "padding: 8px; border-bottom: 1px solid #e5e7eb;";
const TD_RIGHT: &str = "padding: 8px; border-bottom: 1px solid #e5e7eb; text-align: right;";

fn metric_card(label: &str, value: &str, trend: &str, accent: &str) -> String {
    format!(
        r#"<div style="background: white; padding: 20px; border-radius: 8px; border-left: 4px solid {accent}; margin-bottom: 12px;">
  <div style="font-size: 14px; color: #6b7280; margin-bottom: 5px;">{label}</div>
  <div style="font-size: 28px; font-weight: 600; color: #1f2937;">{value}</div>
  <div style="font-size: 12px; margin-top: 5px;">{trend}</div>
</div>"#,
        label = escape_html(label),
        value = escape_html(value),
    )
}

fn share_table(title: &str, first_column: &str, rows: &[(String, u64, f64)]) -> String {
    let body = rows
        .iter()
        .map(|(name, visitors, pct)| {
            format!(
                r#"<tr><td style="{TD_LEFT}">{}</td><td style="{TD_RIGHT}">{}</td><td style="{TD_RIGHT}">{pct:.1}%</td></tr>"#,
                escape_html(name),
                format_count(*visitors as f64),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"<div style="padding: 30px 20px;">
<h2 style="{H2}">{title}</h2>
<table style="width: 100%; border-collapse: collapse; background: white;">
<thead><tr style="background-color: #f3f4f6;"><th style="{TH_LEFT}">{first_column}</th><th style="{TH_RIGHT}">Visitors</th><th style="{TH_RIGHT}">Share</th></tr></thead>
<tbody>
{body}
</tbody>
</table>
</div>"#
    )
}

fn bullet_section(title: &str, items: &[String]) -> String {
    let lis = items
        .iter()
        .map(|s| format!("<li style=\"margin-bottom: 6px;\">{}</li>", escape_html(s)))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"<div style="padding: 30px 20px;">
<h2 style="{H2}">{title}</h2>
<ul style="margin: 0; padding-left: 20px; font-size: 14px;">
{lis}
</ul>
</div>"#
    )
}

pub fn report_html(
    summary: &Summary,
    ai_summary: &str,
    website: &str,
    generated_at: &DateTime<Tz>,
) -> String {
    let website_html = escape_html(website);
    let ai_summary_html = escape_html(ai_summary.trim()).replace('\n', "<br>\n");

    let mut cards = vec![
        metric_card(
            "Total Sessions",
            &format_count(summary.total_views.current),
            &trend_html(&summary.total_views),
            "#667eea",
        ),
        metric_card(
            "Unique Visitors",
            &format_count(summary.unique_visitors.current),
            &trend_html(&summary.unique_visitors),
            "#764ba2",
        ),
    ];
    cards.extend(
        secondary_metrics(summary)
            .into_iter()
            .map(|(label, value, change)| metric_card(label, &value, &trend_html(change), "#0ea5e9")),
    );

    let mut sections = Vec::new();
    if !summary.top_sources.is_empty() {
        let rows: Vec<_> = summary
            .top_sources
            .iter()
            .map(|s| (s.source.clone(), s.visitors, s.percentage))
            .collect();
        sections.push(share_table("Traffic Sources", "Source", &rows));
    }
    if !summary.geographic_breakdown.is_empty() {
        let rows: Vec<_> = summary
            .geographic_breakdown
            .iter()
            .map(|g| (g.location.clone(), g.visitors, g.percentage))
            .collect();
        sections.push(share_table("Top Locations", "Location", &rows));
    }
    if !summary.key_insights.is_empty() {
        sections.push(bullet_section("Key Insights", &summary.key_insights));
    }
    if !summary.recommendations.is_empty() {
        sections.push(bullet_section("Recommendations", &summary.recommendations));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Analytics Report - {website_html}</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #374151; margin: 0; padding: 0; background-color: #f9fafb;">
<div style="max-width: 600px; margin: 0 auto; background-color: #ffffff;">
<div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px 20px; text-align: center;">
<h1 style="margin: 0; font-size: 28px; font-weight: 600;">Analytics Report</h1>
<p style="margin: 10px 0 0 0; font-size: 16px;">{website_html}</p>
<p style="margin: 5px 0 0 0; font-size: 14px;">{period} ({days} days)</p>
</div>
<div style="padding: 30px 20px; background-color: #f9fafb;">
<h2 style="{H2}">Key Metrics</h2>
{cards}
</div>
<div style="padding: 30px 20px;">
<h2 style="{H2}">AI-Powered Insights</h2>
<div style="background: #f0f9ff; border-left: 4px solid #0ea5e9; padding: 15px; font-size: 14px;">
{ai_summary_html}
</div>
</div>
{sections}
<div style="padding: 20px; background-color: #f9fafb; text-align: center; border-top: 1px solid #e5e7eb;">
<p style="margin: 0; font-size: 12px; color: #6b7280;">Generated on {generated}</p>
<p style="margin: 5px 0 0 0; font-size: 12px; color: #9ca3af;">{FOOTER_TAGLINE}</p>
</div>
</div>
</body>
</html>"#,
        period = period_label(summary, generated_at.timezone()),
        days = summary.period_days,
        cards = cards.join("\n"),
        sections = sections.join("\n"),
        generated = generated_label(generated_at),
    )
}

pub fn error_plain(message: &str, details: Option<&str>) -> String {
    format!(
        "ERROR NOTIFICATION\n\
==================\n\n\
An error occurred while generating the analytics report.\n\n\
Error: {message}\n\n\
Details:\n{}\n\n\
Please check the application logs for more information.",
        details.unwrap_or("No additional details available")
    )
}

pub fn error_html(message: &str, details: Option<&str>) -> String {
    let details_block = details
        .map(|d| {
            format!(
                r#"<div style="background-color: #f9f9f9; padding: 15px; margin-top: 15px;">
<h3 style="margin: 0 0 10px 0;">Details:</h3>
<pre style="margin: 0; font-family: monospace; background: white; padding: 10px; font-size: 12px; white-space: pre-wrap;">{}</pre>
</div>"#,
                escape_html(d)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
<div style="max-width: 600px; margin: 0 auto; padding: 20px;">
<div style="background-color: #fee; border-left: 4px solid #f00; padding: 15px; margin-bottom: 20px;">
<h2 style="margin: 0 0 10px 0; color: #c00;">Error Notification</h2>
<p style="margin: 0;">An error occurred while generating the analytics report.</p>
</div>
<div style="background-color: #f9f9f9; padding: 15px;">
<h3 style="margin: 0 0 10px 0;">Error:</h3>
<p style="margin: 0; font-family: monospace; background: white; padding: 10px;">{}</p>
</div>
{details_block}
<p style="margin-top: 20px; font-size: 14px; color: #666;">Please check the application logs for more information.</p>
</div>
</body>
</html>"#,
        escape_html(message)
    )
}
