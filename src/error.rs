use std::io;

/// Custom error type for deploy_hook operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid webhook payload: {0}")]
    PayloadError(String),

    #[error("Deployment failed to start: {0}")]
    DeploymentSpawnFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON parsing error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
