//! Error types for the push dispatch service
//!
//! Transport failures, configuration problems and local I/O all land in
//! `AppError`. Gateway rejections are deliberately absent: a rejected push is
//! reported through the boolean classification, not through an error value.

use std::path::PathBuf;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration value for '{key}': {value}")]
    InvalidConfigValue { key: String, value: String },

    // Gateway transport
    #[error("HTTP request failed: {method} {url}")]
    HttpRequest {
        method: String,
        url: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Network timeout after {timeout_ms} ms: {method} {url}")]
    NetworkTimeout {
        method: String,
        url: String,
        timeout_ms: u64,
    },

    /// The request never left, or its reply could not be handled
    #[error("HTTP client error: {method} {url}")]
    HttpClient {
        method: String,
        url: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Local
    #[error("File I/O error for '{path}': {operation}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Parse error for '{input}': {expected}")]
    Parse {
        input: String,
        expected: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Classify a reqwest failure for the given request.
    ///
    /// Timeouts keep the configured budget so logs show what was exceeded.
    /// Connect, send and body-read failures become `HttpRequest`; builder,
    /// redirect and decode failures become `HttpClient`.
    pub fn from_transport(
        err: reqwest::Error,
        method: impl Into<String>,
        url: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        let method = method.into();
        let url = url.into();
        if err.is_timeout() {
            Self::NetworkTimeout {
                method,
                url,
                timeout_ms,
            }
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::HttpRequest {
                method,
                url,
                source: Some(Box::new(err)),
            }
        } else {
            Self::HttpClient {
                method,
                url,
                source: Some(Box::new(err)),
            }
        }
    }

    /// Whether the retry strategy should try this request again.
    ///
    /// Only network-layer failures qualify. A response with any HTTP status
    /// has already reached the gateway and is never replayed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkTimeout { .. } | Self::HttpRequest { .. })
    }

    /// Label used in error logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::ConfigNotFound { .. } | Self::InvalidConfigValue { .. } => {
                "config"
            }
            Self::HttpRequest { .. } | Self::NetworkTimeout { .. } => "network",
            Self::HttpClient { .. } => "http",
            Self::Io { .. } => "io",
            Self::Validation { .. } | Self::Parse { .. } => "validation",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        Self::Parse {
            input: "URL".to_string(),
            expected: "valid URL format".to_string(),
            source: Some(Box::new(err)),
        }
    }
}
