use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by a [`ProductStore`](super::ProductStore) create call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("catalog HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode catalog response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("catalog request timed out after {0:?}")]
    Timeout(Duration),
    #[error("catalog rejected product: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn status(status: StatusCode, body: String) -> Self {
        StoreError::Status { status, body }
    }
}
