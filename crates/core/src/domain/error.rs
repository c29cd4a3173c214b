// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid interval for adapter {adapter}: {interval_minutes} (must be > 0)")]
    InvalidInterval {
        adapter: String,
        interval_minutes: u32,
    },

    #[error("Invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
