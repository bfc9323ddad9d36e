use std::time::Duration;

/// Failure of a single call to an external service.
///
/// Service crates convert their own error types into this so the engine can
/// decide what to retry without knowing which HTTP client produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("server error (HTTP {status})")]
    Server { status: u16 },

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("not found")]
    NotFound,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Timeouts, connection failures, 5xx and 429 are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connection(_) | Self::Server { .. } | Self::RateLimited { .. }
        )
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(truncate(body)),
            404 => Self::NotFound,
            429 => Self::RateLimited { retry_after },
            500..=599 => Self::Server { status },
            _ => Self::Rejected {
                status,
                message: truncate(body),
            },
        }
    }
}

fn truncate(body: &str) -> String {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].trim().to_string()
}

/// Errors from the persistent cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Other(String),
}

impl CacheError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
