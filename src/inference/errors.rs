//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility — these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to the completion service.
///
/// None of these are retried. They surface to the top-level caller as-is.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The API key environment variable is unset or empty.
    #[error("{env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    /// TCP/HTTP connection to the completion endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx HTTP response from the completion endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body was not a valid chat completion.
    #[error("response parse error: {reason}")]
    ResponseParse { reason: String },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}

impl InferenceError {
    /// Whether the failure came from credentials rather than the network.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            InferenceError::MissingApiKey { .. } | InferenceError::HttpError { status: 401 | 403, .. }
        )
    }
}
