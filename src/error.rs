//! Error types for Scheme Assist.

use crate::workflow::Stage;

/// Message shown when the backend cannot be reached at all.
pub fn unreachable_message(base_url: &str) -> String {
    format!("Cannot connect to the server. Please ensure the backend is running at {base_url}.")
}

/// Failures reported by a `SchemeBackend` implementation.
///
/// These describe what went wrong on the wire. Stage controllers turn them
/// into a `StageError` carrying a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The server could not be reached (connection refused, DNS, timeout).
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// The server answered with a non-2xx status.
    #[error("Backend returned HTTP {status}")]
    Status {
        status: u16,
        /// The `error` field of the JSON body, when there was one.
        message: Option<String>,
    },

    /// The server answered 2xx but the body had an unexpected shape.
    #[error("Malformed backend response: {0}")]
    Malformed(String),

    /// Anything else the transport reported.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors surfaced by the workflow stage controllers.
///
/// `Display` is the human-readable message stored in the workflow's error
/// slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// Client-side input was malformed; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// The backend could not be reached.
    #[error("Cannot connect to the server. Please ensure the backend is running at {base_url}.")]
    Network { base_url: String },

    /// The backend answered but reported failure or sent an unexpected shape.
    #[error("{0}")]
    Server(String),

    /// The stage was invoked before its data dependency existed.
    #[error("{0}")]
    Precondition(String),

    /// Unknown failure.
    #[error("{0}")]
    Unexpected(String),

    /// A request for this stage is already outstanding.
    #[error("Still waiting on the previous {stage} request.")]
    InFlight { stage: Stage },

    /// The response arrived after the request was cancelled or superseded.
    #[error("The {stage} response was discarded because a newer action superseded it.")]
    Superseded { stage: Stage },
}

impl StageError {
    /// Whether this error should be shown to the user.
    ///
    /// Superseded responses are dropped silently, and a refused duplicate
    /// must not overwrite what the outstanding request will report.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Superseded { .. } | Self::InFlight { .. })
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
