use boxsmith_core::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum SeerrError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jellyseerr returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Jellyseerr API key contains invalid characters")]
    InvalidKey,
}

impl From<SeerrError> for ServiceError {
    fn from(e: SeerrError) -> Self {
        match e {
            SeerrError::Http(e) => {
                if e.is_timeout() {
                    ServiceError::Timeout
                } else if e.is_decode() {
                    ServiceError::Decode(e.to_string())
                } else {
                    ServiceError::Connection(e.to_string())
                }
            }
            SeerrError::Status { status, body } => ServiceError::from_status(status, None, &body),
            SeerrError::Json(e) => ServiceError::Decode(e.to_string()),
            SeerrError::InvalidKey => ServiceError::Unauthorized("invalid Jellyseerr API key".into()),
        }
    }
}
