use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Business error reported inside a well-formed envelope.
    #[error("{0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Terminal error: {0}")]
    TerminalError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl ConsoleError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConsoleError::NetworkError(_) | ConsoleError::HttpError(_) | ConsoleError::ApiError(_)
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ConsoleError::TerminalError(_) => ErrorSeverity::Critical,
            ConsoleError::StorageError(_) => ErrorSeverity::High,
            ConsoleError::SqlError(_) => ErrorSeverity::High,
            ConsoleError::AuthenticationError(_) => ErrorSeverity::High,
            ConsoleError::NetworkError(_) => ErrorSeverity::Medium,
            ConsoleError::HttpError(_) => ErrorSeverity::Medium,
            ConsoleError::ApiError(_) => ErrorSeverity::Medium,
            ConsoleError::ValidationError(_) => ErrorSeverity::Low,
            ConsoleError::MetricsError(_) => ErrorSeverity::Low,
            _ => ErrorSeverity::Medium,
        }
    }

    /// Short text suitable for a toast line.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::HttpError(_) | ConsoleError::NetworkError(_) => {
                "Could not reach the gateway".to_string()
            }
            ConsoleError::ApiError(msg)
            | ConsoleError::ValidationError(msg)
            | ConsoleError::AuthenticationError(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<prometheus::Error> for ConsoleError {
    fn from(e: prometheus::Error) -> Self {
        ConsoleError::MetricsError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Critical => "CRITICAL",
            ErrorSeverity::High => "HIGH",
            ErrorSeverity::Medium => "MEDIUM",
            ErrorSeverity::Low => "LOW",
        }
    }
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(ConsoleError::NetworkError("down".into()).is_recoverable());
        assert!(ConsoleError::ApiError("no session".into()).is_recoverable());
        assert!(!ConsoleError::ValidationError("empty".into()).is_recoverable());
        assert!(!ConsoleError::AuthenticationError("bad".into()).is_recoverable());
    }

    #[test]
    fn test_severity() {
        assert_eq!(ConsoleError::TerminalError("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(ConsoleError::ValidationError("x".into()).severity().as_str(), "LOW");
    }

    #[test]
    fn test_user_message_is_verbatim_for_business_errors() {
        let err = ConsoleError::ApiError("No session".into());
        assert_eq!(err.user_message(), "No session");
        assert_eq!(err.to_string(), "No session");
    }
}
