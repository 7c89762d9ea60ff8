use lazy_static::lazy_static;

use crate::models::MetricQueryRequest;
use crate::{MetricQueryError, Result};

/// Placeholder substituted with the `host:port` of a monitored instance.
pub const INSTANCE_PLACEHOLDER: &str = "{instance}";

/// A catalog entry: one charted series and the query template producing it.
#[derive(Debug, Clone, Copy)]
pub struct MetricQueryTemplate {
    pub series_name: &'static str,
    pub promql: &'static str,
}

lazy_static! {
    /// Host-level series charted on every performance report.
    ///
    /// Each template carries exactly one instance placeholder. The disk
    /// and network queries return one series per device; the normalizer
    /// tells those apart with the `device` label.
    pub static ref METRIC_CATALOG: Vec<MetricQueryTemplate> = vec![
        MetricQueryTemplate {
            series_name: "CPU",
            promql: r#"100 - (avg(irate(node_cpu_seconds_total{mode="idle",instance="{instance}"}[1m])) * 100)"#,
        },
        MetricQueryTemplate {
            series_name: "Memory Available",
            promql: r#"node_memory_MemAvailable_bytes{instance="{instance}"}"#,
        },
        MetricQueryTemplate {
            series_name: "Load (1m)",
            promql: r#"node_load1{instance="{instance}"}"#,
        },
        MetricQueryTemplate {
            series_name: "Disk Read",
            promql: r#"irate(node_disk_read_bytes_total{instance="{instance}"}[1m])"#,
        },
        MetricQueryTemplate {
            series_name: "Disk Write",
            promql: r#"irate(node_disk_written_bytes_total{instance="{instance}"}[1m])"#,
        },
        MetricQueryTemplate {
            series_name: "Network In",
            promql: r#"irate(node_network_receive_bytes_total{instance="{instance}"}[1m])"#,
        },
        MetricQueryTemplate {
            series_name: "Network Out",
            promql: r#"irate(node_network_transmit_bytes_total{instance="{instance}"}[1m])"#,
        },
    ];
}

/// Substitute the instance placeholder into a catalog template.
///
/// Templates must carry exactly one placeholder; anything else is a
/// malformed entry and is rejected rather than guessed at.
pub fn expand_template(template: &str, instance: &str) -> Result<String> {
    let placeholders = template.matches(INSTANCE_PLACEHOLDER).count();
    if placeholders != 1 {
        return Err(MetricQueryError::Validation(format!(
            "expected exactly one {} placeholder, found {} in: {}",
            INSTANCE_PLACEHOLDER, placeholders, template
        )));
    }
    Ok(template.replace(INSTANCE_PLACEHOLDER, instance))
}

/// Expand the whole catalog for one monitored instance.
///
/// Pure expansion: one request per catalog entry, no side effects. An
/// empty catalog yields an empty list.
pub fn build_requests(instance: &str) -> Result<Vec<MetricQueryRequest>> {
    METRIC_CATALOG
        .iter()
        .map(|entry| {
            Ok(MetricQueryRequest {
                promql: expand_template(entry.promql, instance)?,
                series_name: entry.series_name.to_string(),
                instance: instance.to_string(),
            })
        })
        .collect()
}
