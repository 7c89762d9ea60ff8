use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{error, info};

use crate::catalog;
use crate::models::{
    MetricQueryRequest, MetricSeries, MonitorConfig, MonitoredInstance, ReportTimeInfo,
    TimeWindow,
};
use crate::query::{normalize, PrometheusClient};
use crate::Result;

/// Fixed date-time format reports record their window in.
pub const TIME_INFO_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Default query resolution: one point per scrape interval.
pub const DEFAULT_STEP_SECS: u32 = 15;

/// External collaborator resolving report records.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// The stored monitor configuration blob of the test behind the
    /// report, if the test carries one.
    async fn monitor_config(&self, report_id: &str) -> Result<Option<String>>;

    /// The report's recorded time window.
    async fn time_info(&self, report_id: &str) -> Result<ReportTimeInfo>;
}

/// Runs every catalog query for a report's monitored instances and
/// aggregates the normalized series.
pub struct MetricCollector<S> {
    store: S,
    client: PrometheusClient,
    step_secs: u32,
}

impl<S: ReportStore> MetricCollector<S> {
    pub fn new(store: S, client: PrometheusClient) -> Self {
        Self::with_step(store, client, DEFAULT_STEP_SECS)
    }

    pub fn with_step(store: S, client: PrometheusClient, step_secs: u32) -> Self {
        Self {
            store,
            client,
            step_secs,
        }
    }

    /// Collect every catalog series for every instance monitored by
    /// `report_id`.
    ///
    /// Reports without monitored instances yield an empty list and no
    /// backend calls. A window that fails to parse degrades to a zero
    /// window; validation and backend failures abort the whole request.
    pub async fn collect_metrics(&self, report_id: &str) -> Result<Vec<MetricSeries>> {
        let instances = self.monitored_instances(report_id).await?;
        if instances.is_empty() {
            info!("Report {} has no monitored instances", report_id);
            return Ok(Vec::new());
        }

        let mut requests: Vec<MetricQueryRequest> = Vec::new();
        for instance in &instances {
            requests.extend(catalog::build_requests(&instance.address())?);
        }

        let window = self.time_window(report_id).await?;
        info!(
            "Collecting {} series for report {} over [{}, {}]",
            requests.len(),
            report_id,
            window.start_millis,
            window.end_millis
        );

        self.run_queries(&requests, window).await
    }

    async fn monitored_instances(&self, report_id: &str) -> Result<Vec<MonitoredInstance>> {
        match self.store.monitor_config(report_id).await? {
            Some(raw) => MonitorConfig::parse_instances(&raw),
            None => Ok(Vec::new()),
        }
    }

    /// Resolve the report's recorded window, degrading to a zero window
    /// when the stored strings do not parse.
    async fn time_window(&self, report_id: &str) -> Result<TimeWindow> {
        let time_info = self.store.time_info(report_id).await?;
        let window = match parse_time_window(&time_info, self.step_secs) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to parse time window of report {}: {}", report_id, e);
                TimeWindow {
                    step_secs: self.step_secs,
                    ..TimeWindow::default()
                }
            }
        };
        Ok(window)
    }

    async fn run_queries(
        &self,
        requests: &[MetricQueryRequest],
        window: TimeWindow,
    ) -> Result<Vec<MetricSeries>> {
        let mut collected = Vec::new();
        for request in requests {
            let response = self
                .client
                .query_range(
                    &request.promql,
                    window.start_millis,
                    window.end_millis,
                    window.step_secs,
                )
                .await?;
            collected.extend(normalize(&request.series_name, &request.instance, &response));
        }
        Ok(collected)
    }
}

/// Parse the two recorded date-time strings into a millisecond window.
fn parse_time_window(
    time_info: &ReportTimeInfo,
    step_secs: u32,
) -> std::result::Result<TimeWindow, chrono::ParseError> {
    let start = NaiveDateTime::parse_from_str(&time_info.start_time, TIME_INFO_FORMAT)?;
    let end = NaiveDateTime::parse_from_str(&time_info.end_time, TIME_INFO_FORMAT)?;
    Ok(TimeWindow {
        start_millis: start.and_utc().timestamp_millis(),
        end_millis: end.and_utc().timestamp_millis(),
        step_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::METRIC_CATALOG;
    use crate::MetricQueryError;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;

    struct StubStore {
        config: Option<String>,
        time_info: ReportTimeInfo,
    }

    impl StubStore {
        fn with_one_instance() -> Self {
            Self {
                config: Some(r#"{"monitorParams": [{"ip": "10.0.0.1", "port": 9100}]}"#.to_string()),
                time_info: ReportTimeInfo {
                    start_time: "2023/11/14 22:00:00".to_string(),
                    end_time: "2023/11/14 22:30:00".to_string(),
                },
            }
        }
    }

    #[async_trait]
    impl ReportStore for StubStore {
        async fn monitor_config(&self, _report_id: &str) -> Result<Option<String>> {
            Ok(self.config.clone())
        }

        async fn time_info(&self, _report_id: &str) -> Result<ReportTimeInfo> {
            Ok(self.time_info.clone())
        }
    }

    fn success_body() -> serde_json::Value {
        serde_json::json!({
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [{
                    "metric": {"instance": "10.0.0.1:9100"},
                    "values": [[1700000000.0, "1.0"], [1700000015.0, "2.0"]]
                }]
            }
        })
    }

    #[test]
    fn parses_the_recorded_window_format() {
        let window = parse_time_window(
            &ReportTimeInfo {
                start_time: "2023/11/14 22:00:00".to_string(),
                end_time: "2023/11/14 22:30:00".to_string(),
            },
            15,
        )
        .unwrap();

        assert_eq!(window.start_millis, 1_699_999_200_000);
        assert_eq!(window.end_millis, 1_700_001_000_000);
        assert_eq!(window.step_secs, 15);
        assert!(window.start_millis <= window.end_millis);
    }

    #[tokio::test]
    async fn no_monitored_instances_means_no_backend_calls() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/query_range");
                then.status(200).json_body(success_body());
            })
            .await;

        let store = StubStore {
            config: None,
            time_info: ReportTimeInfo {
                start_time: "2023/11/14 22:00:00".to_string(),
                end_time: "2023/11/14 22:30:00".to_string(),
            },
        };
        let collector = MetricCollector::new(store, PrometheusClient::new(&server.base_url()));

        let collected = collector.collect_metrics("report-1").await.unwrap();
        assert!(collected.is_empty());
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn collects_one_series_per_catalog_entry() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/query_range")
                    .query_param("step", "15");
                then.status(200).json_body(success_body());
            })
            .await;

        let collector = MetricCollector::new(
            StubStore::with_one_instance(),
            PrometheusClient::new(&server.base_url()),
        );

        let collected = collector.collect_metrics("report-1").await.unwrap();
        assert_eq!(mock.hits_async().await, METRIC_CATALOG.len());
        assert_eq!(collected.len(), METRIC_CATALOG.len());

        let names: Vec<&str> = collected.iter().map(|s| s.series_name.as_str()).collect();
        let expected: Vec<&str> = METRIC_CATALOG.iter().map(|e| e.series_name).collect();
        assert_eq!(names, expected);
        for series in &collected {
            assert_eq!(series.instance, "10.0.0.1:9100");
            assert_eq!(series.values, vec![1.0, 2.0]);
        }
    }

    #[tokio::test]
    async fn unparseable_window_degrades_to_a_zero_window() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/query_range")
                    .query_param("start", "0.000")
                    .query_param("end", "0.000");
                then.status(200).json_body(success_body());
            })
            .await;

        let store = StubStore {
            time_info: ReportTimeInfo {
                start_time: "14.11.2023 22:00".to_string(),
                end_time: "garbage".to_string(),
            },
            ..StubStore::with_one_instance()
        };
        let collector = MetricCollector::new(store, PrometheusClient::new(&server.base_url()));

        let collected = collector.collect_metrics("report-1").await.unwrap();
        assert_eq!(mock.hits_async().await, METRIC_CATALOG.len());
        assert_eq!(collected.len(), METRIC_CATALOG.len());
    }

    #[tokio::test]
    async fn unreachable_backend_aborts_the_request() {
        let collector = MetricCollector::new(
            StubStore::with_one_instance(),
            PrometheusClient::new("http://127.0.0.1:1"),
        );

        let err = collector.collect_metrics("report-1").await.unwrap_err();
        assert!(matches!(err, MetricQueryError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn non_success_responses_collect_to_an_empty_list() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/query_range");
                then.status(200).json_body(serde_json::json!({
                    "status": "error",
                    "errorType": "timeout",
                    "error": "query timed out"
                }));
            })
            .await;

        let collector = MetricCollector::new(
            StubStore::with_one_instance(),
            PrometheusClient::new(&server.base_url()),
        );

        let collected = collector.collect_metrics("report-1").await.unwrap();
        assert!(collected.is_empty());
    }
}
