use std::time::Duration;

use boxsmith_core::ServiceError;

/// Errors that can occur while talking to TMDb or loading catalog data.
#[derive(Debug, thiserror::Error)]
pub enum TmdbError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TMDb returned HTTP {status}: {body}")]
    Status {
        status: u16,
        retry_after: Option<Duration>,
        body: String,
    },

    #[error("TMDb API key is invalid")]
    InvalidKey,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot dataset error: {0}")]
    Snapshot(String),
}

impl TmdbError {
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }
}

impl From<TmdbError> for ServiceError {
    fn from(e: TmdbError) -> Self {
        match e {
            TmdbError::Http(e) => {
                if e.is_timeout() {
                    ServiceError::Timeout
                } else if e.is_decode() {
                    ServiceError::Decode(e.to_string())
                } else {
                    ServiceError::Connection(e.to_string())
                }
            }
            TmdbError::Status {
                status,
                retry_after,
                body,
            } => ServiceError::from_status(status, retry_after, &body),
            TmdbError::InvalidKey => ServiceError::Unauthorized("TMDb API key is invalid".into()),
            TmdbError::Json(e) => ServiceError::Decode(e.to_string()),
            TmdbError::Io(e) => ServiceError::Connection(e.to_string()),
            TmdbError::Snapshot(msg) => ServiceError::Decode(msg),
        }
    }
}
