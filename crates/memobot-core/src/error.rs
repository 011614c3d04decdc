use thiserror::Error;

/// Top-level error type for Memobot.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for MemobotError` so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MemobotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MemobotError {
    fn from(err: toml::de::Error) -> Self {
        MemobotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MemobotError {
    fn from(err: serde_json::Error) -> Self {
        MemobotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Memobot operations.
pub type Result<T> = std::result::Result<T, MemobotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases: Vec<(MemobotError, &str)> = vec![
            (
                MemobotError::Config("missing bot token".to_string()),
                "Configuration error: missing bot token",
            ),
            (
                MemobotError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                MemobotError::Fetch("connection reset".to_string()),
                "Fetch error: connection reset",
            ),
            (
                MemobotError::Delivery("chat not found".to_string()),
                "Delivery error: chat not found",
            ),
            (
                MemobotError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MemobotError = io_err.into();
        assert!(matches!(err, MemobotError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: MemobotError = err.unwrap_err().into();
        assert!(matches!(err, MemobotError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: MemobotError = err.unwrap_err().into();
        assert!(matches!(err, MemobotError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
