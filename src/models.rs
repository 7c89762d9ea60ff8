use serde::{Deserialize, Serialize};

/// One normalized time series, ready for charting.
///
/// `timestamps` and `values` are parallel sequences of equal length; a
/// series with no data points is never constructed. `unique_label` is
/// set when the backend returned several series for the same query and
/// one label told them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub series_name: String,
    pub instance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_label: Option<String>,
    pub timestamps: Vec<String>,
    pub values: Vec<f64>,
}

/// A single range query to run against the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricQueryRequest {
    pub promql: String,
    pub series_name: String,
    pub instance: String,
}

/// A host under monitoring, addressed as `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredInstance {
    pub host: String,
    pub port: u16,
}

impl MonitoredInstance {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Report time window in millisecond epochs plus the query step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_millis: i64,
    pub end_millis: i64,
    pub step_secs: u32,
}

/// The two formatted date-time strings recorded on a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTimeInfo {
    pub start_time: String,
    pub end_time: String,
}

/// Stored monitor configuration blob attached to a load test.
///
/// Only the `monitorParams` array matters here; the blob carries other
/// test settings that this crate ignores.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorConfig {
    #[serde(default, rename = "monitorParams")]
    pub monitor_params: Vec<MonitorParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorParam {
    pub ip: String,
    pub port: u16,
}

impl MonitorConfig {
    /// Parse the configuration blob and pull out the monitored instances.
    pub fn parse_instances(raw: &str) -> crate::Result<Vec<MonitoredInstance>> {
        let config: MonitorConfig = serde_json::from_str(raw)?;
        Ok(config
            .monitor_params
            .into_iter()
            .map(|p| MonitoredInstance {
                host: p.ip,
                port: p.port,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricQueryError;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_monitor_params_into_instances() {
        let raw = r#"{
            "timeout": 30,
            "monitorParams": [
                {"ip": "10.0.0.1", "port": 9100, "name": "web-1"},
                {"ip": "10.0.0.2", "port": 9100}
            ]
        }"#;

        let instances = MonitorConfig::parse_instances(raw).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].address(), "10.0.0.1:9100");
        assert_eq!(instances[1].address(), "10.0.0.2:9100");
    }

    #[test]
    fn missing_monitor_params_means_no_instances() {
        let instances = MonitorConfig::parse_instances(r#"{"timeout": 30}"#).unwrap();
        assert!(instances.is_empty());
    }

    #[test]
    fn malformed_blob_is_a_decode_error() {
        let err = MonitorConfig::parse_instances("not json").unwrap_err();
        assert!(matches!(err, MetricQueryError::Decode(_)));
    }

    #[test]
    fn mistyped_port_is_a_decode_error() {
        let raw = r#"{"monitorParams": [{"ip": "10.0.0.1", "port": "nine"}]}"#;
        let err = MonitorConfig::parse_instances(raw).unwrap_err();
        assert!(matches!(err, MetricQueryError::Decode(_)));
    }
}
