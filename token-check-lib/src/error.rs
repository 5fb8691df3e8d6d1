//! Error handling for token checking operations.
//!
//! Per-token failures never surface as errors: the checker folds them into a
//! failed [`TokenResult`](crate::TokenResult). This type covers the failures
//! that do cross API boundaries: transport errors seen by the checker, bad
//! input, and configuration problems.

use std::time::Duration;

/// Main error type for token checking operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenCheckError {
    /// The credential list was empty after trimming and dropping blank lines
    #[error("{source_name} is empty.")]
    EmptyInput { source_name: String },

    /// Network-related errors (connection refused, DNS, broken body, etc.)
    #[error("{}", format_network(message, detail.as_deref()))]
    NetworkError {
        message: String,
        detail: Option<String>,
    },

    /// A single request attempt exceeded its wall-clock budget
    #[error("Timeout after {duration:?} during: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// JSON / TOML parsing errors
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Configuration errors (invalid settings, etc.)
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File I/O errors when reading token lists or config files
    #[error("File error at '{path}': {message}")]
    FileError { path: String, message: String },
}

fn format_network(message: &str, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("Network error: {} (source: {})", message, detail),
        None => format!("Network error: {}", message),
    }
}

impl TokenCheckError {
    /// Create a new empty-input error.
    pub fn empty_input<S: Into<String>>(source_name: S) -> Self {
        Self::EmptyInput {
            source_name: source_name.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            detail: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, detail: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Map a `reqwest` send error, keeping the configured attempt timeout.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", timeout)
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }

    /// Check if this error suggests the request should be retried.
    ///
    /// Only attempt-level transport failures qualify; input and config
    /// problems will not improve on a second try.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for TokenCheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON parsing failed: {}", err))
    }
}

impl From<toml::de::Error> for TokenCheckError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_message() {
        let err = TokenCheckError::empty_input("tokens.txt");
        assert_eq!(err.to_string(), "tokens.txt is empty.");
    }

    #[test]
    fn test_network_message_with_and_without_source() {
        assert_eq!(
            TokenCheckError::network("boom").to_string(),
            "Network error: boom"
        );
        assert_eq!(
            TokenCheckError::network_with_source("Connection failed", "refused").to_string(),
            "Network error: Connection failed (source: refused)"
        );
    }

    #[test]
    fn test_json_error_becomes_parse_error() {
        let err: TokenCheckError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, TokenCheckError::ParseError { .. }));
        assert!(err.to_string().starts_with("Parse error: JSON parsing failed:"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(TokenCheckError::network("reset").is_retryable());
        assert!(TokenCheckError::timeout("GET", Duration::from_secs(10)).is_retryable());
        assert!(!TokenCheckError::parse("bad json").is_retryable());
        assert!(!TokenCheckError::config("workers = 0").is_retryable());
        assert!(!TokenCheckError::empty_input("tokens.txt").is_retryable());
    }
}
