pub mod client;
pub mod normalize;

pub use client::{PrometheusClient, QueryData, RangeQueryResponse, RangeSeries};
pub use normalize::normalize;
