//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. The `Display`
//! text is written for humans: it is what the CLI prints when a request
//! fails, so it names the endpoint or status involved.

use thiserror::Error;

/// Errors that can occur while talking to the inference server.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the inference server failed.
    #[error("error connecting to inference server at {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The server did not finish the exchange within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout {
        duration_secs: u64,
    },

    /// Non-2xx HTTP response from the inference server.
    #[error("received status code {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// Body read failure, or the server reported an error mid-stream.
    #[error("stream error: {reason}")]
    StreamError {
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl InferenceError {
    /// HTTP status code, if this is an `HttpError`.
    pub fn status(&self) -> Option<u16> {
        match self {
            InferenceError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Extract the error body text, if this is an `HttpError`.
    pub fn error_body(&self) -> Option<&str> {
        match self {
            InferenceError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether the server was never reached (refused, DNS, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            InferenceError::ConnectionFailed { .. } | InferenceError::Timeout { .. }
        )
    }
}
