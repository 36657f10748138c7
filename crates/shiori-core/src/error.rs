//! Error types for the shiori catalog browser.

use thiserror::Error;

/// Result type alias using shiori's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for catalog operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Request never reached the remote or never returned
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote returned a client-error status for a malformed or
    /// unsupported request shape
    #[error("Rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Invalid or expired credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Response body could not be decoded into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error means the stored credential must be dropped.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// True when a compatibility-fallback retry may recover this error.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Error::Rejected { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_transport() {
        let err = Error::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_error_display_rejected() {
        let err = Error::Rejected {
            status: 400,
            message: "unknown field".to_string(),
        };
        assert_eq!(err.to_string(), "Rejected request (400): unknown field");
    }

    #[test]
    fn test_error_display_auth() {
        let err = Error::Auth("token expired".to_string());
        assert_eq!(err.to_string(), "Authentication failed: token expired");
    }

    #[test]
    fn test_error_display_decode() {
        let err = Error::Decode("missing field `results`".to_string());
        assert_eq!(err.to_string(), "Decode error: missing field `results`");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("empty base URL".to_string());
        assert_eq!(err.to_string(), "Configuration error: empty base URL");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("batch too large".to_string());
        assert_eq!(err.to_string(), "Invalid input: batch too large");
    }

    #[test]
    fn test_is_auth() {
        assert!(Error::Auth("x".to_string()).is_auth());
        assert!(!Error::Transport("x".to_string()).is_auth());
    }

    #[test]
    fn test_is_rejected() {
        let err = Error::Rejected {
            status: 400,
            message: "bad".to_string(),
        };
        assert!(err.is_rejected());
        assert!(!Error::Auth("x".to_string()).is_rejected());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Decode(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Decode error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
