// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown adapter requested: {0}")]
    UnknownAdapter(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Configuration errors fail the current call and are never retried by the core
    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::UnknownAdapter(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx / redis / reqwest errors are converted in their infra crates
// (orphan rule: no From impls for foreign error types here)

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class() {
        assert!(AppError::UnknownAdapter("nope".into()).is_configuration());
        assert!(AppError::Config("bad engine".into()).is_configuration());
        assert!(!AppError::Transport("503".into()).is_configuration());
    }
}
