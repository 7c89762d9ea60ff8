use lazy_static::lazy_static;
use prometheus::{
    Counter, Histogram, IntCounter,
    register_counter, register_histogram, register_int_counter,
};
use std::time::Instant;

lazy_static! {
    // Backend query metrics
    pub static ref BACKEND_QUERIES: IntCounter = register_int_counter!(
        "metric_backend_queries_total",
        "Total number of range queries issued to the metrics backend"
    ).unwrap();

    pub static ref BACKEND_QUERY_FAILURES: Counter = register_counter!(
        "metric_backend_query_failures_total",
        "Total number of range queries failing in transport or decode"
    ).unwrap();

    pub static ref BACKEND_QUERY_DURATION: Histogram = register_histogram!(
        "metric_backend_query_duration_seconds",
        "Round trip time for backend range queries",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]
    ).unwrap();

    // Normalization metrics
    pub static ref POINTS_DROPPED: IntCounter = register_int_counter!(
        "metric_points_dropped_total",
        "Total number of data points dropped during normalization"
    ).unwrap();

    pub static ref SERIES_EMITTED: IntCounter = register_int_counter!(
        "metric_series_emitted_total",
        "Total number of normalized series emitted"
    ).unwrap();
}

pub struct QueryTimer {
    start: Instant,
}

impl QueryTimer {
    pub fn new() -> Self {
        BACKEND_QUERIES.inc();
        Self {
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        BACKEND_QUERY_DURATION.observe(duration);
    }
}

pub fn record_query_failure() {
    BACKEND_QUERY_FAILURES.inc();
}

pub fn record_dropped_point() {
    POINTS_DROPPED.inc();
}

pub fn record_emitted_series(count: usize) {
    SERIES_EMITTED.inc_by(count as u64);
}
