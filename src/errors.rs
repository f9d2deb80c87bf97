//! Keyward error types.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Which anti-tamper heuristic tripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TamperSignal {
    /// Wall clock moved backwards since the previous check.
    ClockRollback {
        /// The checkpoint recorded by the previous successful check.
        previous: DateTime<Utc>,
        /// The reading that was earlier than the checkpoint.
        observed: DateTime<Utc>,
    },

    /// The entry bytes of a named function look like a redirection.
    HookedFunction(String),
}

impl fmt::Display for TamperSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TamperSignal::ClockRollback { previous, observed } => write!(
                f,
                "system clock moved backwards ({} -> {})",
                previous.to_rfc3339(),
                observed.to_rfc3339()
            ),
            TamperSignal::HookedFunction(name) => write!(f, "function `{}` appears hooked", name),
        }
    }
}

/// Errors that can occur while talking to the validation service.
#[derive(Debug, Error)]
pub enum KeywardError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No license key provided.
    #[error("No license key provided")]
    MissingLicense,

    /// Connection, send or receive failure (including timeouts).
    #[error("Connection error: {0}")]
    Transport(String),

    /// The server answered with an empty body (offline or timed out).
    #[error("No response from server (offline or timed out)")]
    EmptyResponse,

    /// An anti-tamper check failed; the request was never sent.
    #[error("Tamper detected: {0}")]
    TamperDetected(TamperSignal),

    /// The server explicitly denied the key.
    #[error("{0}")]
    ValidationRejected(String),

    /// The server reported an error instead of a verdict.
    #[error("Server error: {0}")]
    ServerError(String),

    /// Expected markers or data were absent from a response.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Encoding or sealing a value failed.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Credential store I/O error.
    #[error("Credential store error: {0}")]
    CredentialStore(String),
}

impl KeywardError {
    /// Whether this error was raised before any network I/O happened.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            KeywardError::ConfigError(_)
                | KeywardError::MissingLicense
                | KeywardError::TamperDetected(_)
                | KeywardError::Codec(_)
                | KeywardError::CredentialStore(_)
        )
    }
}
