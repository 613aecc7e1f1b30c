use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service error {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    #[error("Resource unavailable: {0}")]
    UnavailableResource(String),

    #[error("Unknown action kind: {0}")]
    UnknownActionKind(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl VoxError {
    /// Rate limits, server errors and transport failures are worth another attempt.
    /// Timeouts and other client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            VoxError::Network(_) => true,
            VoxError::Service { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, VoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_retryable() {
        let err = VoxError::Service {
            status: 429,
            message: "slow down".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_server_error_is_retryable() {
        let err = VoxError::Service {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_client_error_is_terminal() {
        let err = VoxError::Service {
            status: 401,
            message: "bad key".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_is_terminal() {
        assert!(!VoxError::Timeout(Duration::from_secs(15)).is_retryable());
    }
}
