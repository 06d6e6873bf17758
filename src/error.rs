//! Error types for fetch-syncer
//!
//! Most failures never surface as an `Err`: the request lifecycle folds them
//! into a [`RequestResult`](crate::types::RequestResult). The types here cover
//! what does escape (after-hook failures, gate task panics, codec and config
//! errors) plus the error contracts of the transport and hook seams.

use thiserror::Error;

/// Result type alias for fetch-syncer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result code recorded for failures that carry no numeric code of their own
pub const GENERIC_FAILURE_CODE: i32 = -1;

/// Main error type for fetch-syncer
#[derive(Debug, Error)]
pub enum Error {
    /// A request hook failed
    ///
    /// Only the after hook can surface this; before-hook failures are folded
    /// into the request result.
    #[error("hook error: {0}")]
    Hook(#[from] HookError),

    /// A task submitted to a concurrency gate panicked
    #[error("task panicked before settling")]
    TaskPanicked,

    /// A task submitted to a concurrency gate was dropped without running
    /// (for example because the runtime shut down)
    #[error("task dropped before settling")]
    TaskDropped,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrency")
        key: Option<String>,
    },

    /// A URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Base64 input could not be decoded
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Transport error that escaped the request lifecycle
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl Error {
    /// Numeric code to record on a synthesized failure result
    pub fn result_code(&self) -> i32 {
        match self {
            Error::Hook(e) => e.code.unwrap_or(GENERIC_FAILURE_CODE),
            Error::Transport(e) => e.code(),
            _ => GENERIC_FAILURE_CODE,
        }
    }
}

/// Errors raised by a [`Transport`](crate::transport::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// The cancellation token passed to the transport fired
    #[error("request aborted")]
    Aborted,

    /// Network failure reported by reqwest
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// The request could not be built (bad method, header name or value)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport failure, optionally with a numeric code
    #[error("{message}")]
    Other {
        /// Transport-specific error code
        code: Option<i32>,
        /// Human-readable error message
        message: String,
    },
}

impl TransportError {
    /// Whether this error is the cancellation condition
    pub fn is_aborted(&self) -> bool {
        matches!(self, TransportError::Aborted)
    }

    /// Numeric code to record on the request result
    pub fn code(&self) -> i32 {
        match self {
            TransportError::Other {
                code: Some(code), ..
            } => *code,
            _ => GENERIC_FAILURE_CODE,
        }
    }
}

/// Error returned by a before or after hook
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HookError {
    /// Optional numeric code recorded on the result when the hook fails
    pub code: Option<i32>,
    /// Human-readable error message
    pub message: String,
}

impl HookError {
    /// Create a hook error without a numeric code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create a hook error carrying a numeric code
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}
