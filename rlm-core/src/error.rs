//! Error type for the memory engine.

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the memory engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("store is busy, retry later")]
    StoreBusy,

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("oracle unreachable: {0}")]
    OracleUnreachable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether a caller might reasonably retry this operation.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::StoreBusy | Error::OracleUnreachable(_))
    }

    /// Whether this represents a "not found" condition, which the CLI and
    /// query surface treat as exit-0 for list/search operations.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_busy_is_recoverable() {
        assert!(Error::StoreBusy.is_recoverable());
    }

    #[test]
    fn not_found_is_not_recoverable() {
        let err = Error::NotFound("m_deadbeef0000".to_string());
        assert!(!err.is_recoverable());
        assert!(err.is_not_found());
    }

    #[test]
    fn invalid_input_display() {
        let err = Error::InvalidInput("missing --file".to_string());
        assert_eq!(err.to_string(), "invalid input: missing --file");
    }
}
