use boxsmith_core::ServiceError;

use crate::events::Stage;

/// Errors that abort a run. Everything per item or per collection is
/// recorded in the report instead.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot dataset error: {0}")]
    Snapshot(String),

    #[error("Cannot read library: {0}")]
    Library(ServiceError),

    #[error("Run cancelled before the {0} stage")]
    Cancelled(Stage),
}

impl RunError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }
}
