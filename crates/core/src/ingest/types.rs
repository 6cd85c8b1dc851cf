//! GA4 Data API `runReport` wire format (v1beta, JSON mapping).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    pub date_ranges: Vec<DateRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Named>,
    pub metrics: Vec<Named>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<FilterExpression>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_bys: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metric_aggregations: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Named {
    pub name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterExpression {
    pub filter: Filter,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field_name: &'static str,
    pub string_filter: StringFilter,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringFilter {
    pub match_type: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBy {
    pub metric: MetricOrderBy,
    pub desc: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOrderBy {
    pub metric_name: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub totals: Vec<Row>,
    #[serde(default)]
    pub row_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    #[serde(default)]
    pub dimension_values: Vec<CellValue>,
    #[serde(default)]
    pub metric_values: Vec<CellValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellValue {
    #[serde(default)]
    pub value: String,
}

impl RunReportRequest {
    pub fn new(start_date: String, end_date: String) -> Self {
        Self {
            date_ranges: vec![DateRange {
                start_date,
                end_date,
            }],
            ..Default::default()
        }
    }

    pub fn dimensions(mut self, names: &[&'static str]) -> Self {
        self.dimensions = names.iter().map(|&name| Named { name }).collect();
        self
    }

    pub fn metrics(mut self, names: &[&'static str]) -> Self {
        self.metrics = names.iter().map(|&name| Named { name }).collect();
        self
    }

    /// Rank rows by `metric`, largest first, and include a TOTAL row for share math.
    pub fn ranked_by(mut self, metric: &'static str, limit: i64) -> Self {
        self.order_bys = vec![OrderBy {
            metric: MetricOrderBy {
                metric_name: metric,
            },
            desc: true,
        }];
        self.limit = Some(limit);
        self.metric_aggregations = vec!["TOTAL"];
        self
    }

    pub fn exact_match(mut self, field_name: &'static str, value: &str) -> Self {
        self.dimension_filter = Some(FilterExpression {
            filter: Filter {
                field_name,
                string_filter: StringFilter {
                    match_type: "EXACT",
                    value: value.to_string(),
                },
            },
        });
        self
    }
}

impl Row {
    pub fn dimension(&self, idx: usize) -> &str {
        self.dimension_values
            .get(idx)
            .map(|v| v.value.as_str())
            .unwrap_or_default()
    }

    pub fn metric_f64(&self, idx: usize) -> anyhow::Result<f64> {
        let raw = self
            .metric_values
            .get(idx)
            .map(|v| v.value.trim())
            .ok_or_else(|| anyhow::anyhow!("metric value #{idx} missing from report row"))?;
        if raw.is_empty() {
            return Ok(0.0);
        }
        raw.parse::<f64>()
            .map_err(|e| anyhow::anyhow!("metric value #{idx} is not numeric ({raw:?}): {e}"))
    }

    pub fn metric_u64(&self, idx: usize) -> anyhow::Result<u64> {
        let v = self.metric_f64(idx)?;
        anyhow::ensure!(v >= 0.0, "metric value #{idx} is negative: {v}");
        Ok(v.round() as u64)
    }
}
