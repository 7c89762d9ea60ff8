use std::collections::{BTreeMap, BTreeSet};

use chrono::{TimeZone, Utc};
use tracing::warn;

use super::client::{RangeQueryResponse, RangeSeries};
use crate::metrics;
use crate::models::MetricSeries;

/// Rendering applied to every charted timestamp, in UTC.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Status value the backend uses for an answerable query.
const STATUS_SUCCESS: &str = "success";

/// Turn one raw range-query response into chartable series records.
///
/// A non-success response or an empty result set yields no records;
/// that is "no data", not an error. When the backend returns several
/// series for one query, a label whose values distinguish every series
/// is attached to each record so consumers can tell them apart. A data
/// point that fails conversion is dropped and the rest of its series
/// kept. Series order follows the backend's.
pub fn normalize(
    series_name: &str,
    instance: &str,
    response: &RangeQueryResponse,
) -> Vec<MetricSeries> {
    if response.status != STATUS_SUCCESS {
        return Vec::new();
    }
    let result = match &response.data {
        Some(data) => &data.result,
        None => return Vec::new(),
    };

    let unique_label_key = detect_unique_label(result);

    let mut list = Vec::with_capacity(result.len());
    for series in result {
        let mut timestamps = Vec::with_capacity(series.values.len());
        let mut values = Vec::with_capacity(series.values.len());

        for (epoch_secs, value) in &series.values {
            let millis = (epoch_secs * 1000.0) as i64;
            let rendered = match Utc.timestamp_millis_opt(millis).single() {
                Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
                None => {
                    warn!("Dropping point with out-of-range timestamp {}", epoch_secs);
                    metrics::record_dropped_point();
                    continue;
                }
            };
            let parsed = match value.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    warn!("Dropping point with unparseable value {:?}", value);
                    metrics::record_dropped_point();
                    continue;
                }
            };
            timestamps.push(rendered);
            values.push(parsed);
        }

        // Never emit a zero-length series.
        if values.is_empty() {
            continue;
        }

        let unique_label = unique_label_key
            .as_deref()
            .and_then(|key| series.metric.get(key))
            .cloned();

        list.push(MetricSeries {
            series_name: series_name.to_string(),
            instance: instance.to_string(),
            unique_label,
            timestamps,
            values,
        });
    }

    metrics::record_emitted_series(list.len());
    list
}

/// Find a label taking a distinct value on every returned series.
///
/// Only meaningful when more than one series came back: a label
/// qualifies iff its distinct value count equals the series count,
/// making it a bijection between series and values. When several labels
/// qualify the lexicographically first name wins.
fn detect_unique_label(result: &[RangeSeries]) -> Option<String> {
    if result.len() <= 1 {
        return None;
    }

    let mut label_values: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for series in result {
        for (name, value) in &series.metric {
            label_values
                .entry(name.as_str())
                .or_default()
                .insert(value.as_str());
        }
    }

    label_values
        .into_iter()
        .find(|(_, values)| values.len() == result.len())
        .map(|(name, _)| name.to_string())
}
