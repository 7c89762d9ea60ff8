use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricQueryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for MetricQueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MetricQueryError::Decode(err.to_string())
        } else {
            MetricQueryError::BackendUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MetricQueryError {
    fn from(err: serde_json::Error) -> Self {
        MetricQueryError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetricQueryError>;
