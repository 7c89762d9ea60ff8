use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::metrics::{self, QueryTimer};
use crate::{MetricQueryError, Result};

/// Raw range-query response as returned by the backend.
///
/// Mirrors the Prometheus HTTP API shape: `status` gates everything,
/// `data.result` carries one entry per returned series, and error
/// details ride alongside when `status` is not `"success"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeQueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryData {
    #[serde(default, rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<RangeSeries>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RangeSeries {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub values: Vec<(f64, String)>,
}

/// Client for the metrics backend's range-query endpoint.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    http: reqwest::Client,
}

impl PrometheusClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one range query over `[start_millis, end_millis]` at `step_secs`.
    ///
    /// End times in the future are clamped to the current wall-clock
    /// time; the backend cannot answer queries about the future. The raw
    /// parsed document is returned as-is, including non-success statuses,
    /// which the normalizer decides the meaning of.
    pub async fn query_range(
        &self,
        promql: &str,
        start_millis: i64,
        end_millis: i64,
        step_secs: u32,
    ) -> Result<RangeQueryResponse> {
        if promql.trim().is_empty() {
            return Err(MetricQueryError::Validation("promQL is empty".to_string()));
        }

        let end_millis = effective_end_millis(end_millis, Utc::now().timestamp_millis());
        let start = format_epoch_seconds(start_millis);
        let end = format_epoch_seconds(end_millis);
        let step = step_secs.to_string();

        debug!("Range query {} [{} .. {}] step {}s", promql, start, end, step_secs);

        let url = format!("{}/api/v1/query_range", self.base_url);
        let timer = QueryTimer::new();
        let body = async {
            let response = self
                .http
                .get(&url)
                .query(&[
                    ("query", promql),
                    ("start", start.as_str()),
                    ("end", end.as_str()),
                    ("step", step.as_str()),
                ])
                .send()
                .await?;
            response.json::<RangeQueryResponse>().await
        }
        .await
        .map_err(|e| {
            metrics::record_query_failure();
            MetricQueryError::from(e)
        });
        drop(timer);

        body
    }
}

/// Clamp a requested end time to the current wall-clock time.
fn effective_end_millis(requested_millis: i64, now_millis: i64) -> i64 {
    requested_millis.min(now_millis)
}

/// Render a millisecond epoch as fractional Unix seconds with exactly
/// three decimal digits, the precision the backend expects.
fn format_epoch_seconds(millis: i64) -> String {
    format!("{:.3}", millis as f64 / 1000.0)
}
