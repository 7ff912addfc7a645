//! Domain-level error types for clickup-chat-backup.
//!
//! All errors are typed with `thiserror` and provide meaningful context
//! without exposing internal details to end users.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport-level failure (connection refused, timeout, TLS).
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The API rejected the credential (401) or the resource (403).
    #[error("Authentication failed ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Non-retryable API response.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// A transient failure persisted past the retry budget.
    #[error("Request failed after {attempts} retries: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Response body was not the expected JSON shape.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Invalid or missing data.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// JSON serialization or parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// CSV serialization failed.
    #[error("CSV error: {message}")]
    Csv {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create an HTTP error from a reqwest error.
    pub fn http(err: reqwest::Error) -> Self {
        Self::Http {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a CSV error.
    pub fn csv(err: csv::Error) -> Self {
        Self::Csv {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Whether the error invalidates the whole run rather than one resource.
    ///
    /// A rejected token (401) fails every later request too.
    #[must_use]
    pub const fn aborts_run(&self) -> bool {
        matches!(self, Self::Unauthorized { status: 401, .. })
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
