use boxsmith_core::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum JellyfinError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jellyfin returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Jellyfin API key contains invalid characters")]
    InvalidKey,

    #[error("No enabled Jellyfin user found")]
    NoUser,
}

impl From<JellyfinError> for ServiceError {
    fn from(e: JellyfinError) -> Self {
        match e {
            JellyfinError::Http(e) => {
                if e.is_timeout() {
                    ServiceError::Timeout
                } else if e.is_decode() {
                    ServiceError::Decode(e.to_string())
                } else {
                    ServiceError::Connection(e.to_string())
                }
            }
            JellyfinError::Status { status, body } => ServiceError::from_status(status, None, &body),
            JellyfinError::Json(e) => ServiceError::Decode(e.to_string()),
            JellyfinError::InvalidKey => ServiceError::Unauthorized("invalid Jellyfin API key".into()),
            JellyfinError::NoUser => ServiceError::Unauthorized("no enabled Jellyfin user".into()),
        }
    }
}
