use boxsmith_lib::RunError;
use thiserror::Error;

/// Errors that end a CLI command with a non-zero exit status.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid settings
    #[error("Config error: {0}")]
    Config(String),

    /// A service could not be reached or rejected our credentials
    #[error("{0}")]
    Service(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Run(#[from] RunError),
}

impl CliError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    pub(crate) fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}
