//! Error types for rig sessions.

use thiserror::Error;
use valvelink_messenger::{MessengerError, ProtocolError, TransportError};

use crate::session::SessionState;

/// Errors that can occur while driving a rig.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The device did not answer the probe, or answered with another identity.
    #[error("probe mismatch: expected {expected:?}, found {found:?}")]
    ProbeMismatch {
        /// Identity this host was configured for.
        expected: String,
        /// Identity the device reported, if it answered at all.
        found: Option<String>,
    },

    /// The compiled command table differs from the pinned fingerprint.
    #[error("schema fingerprint mismatch: expected {expected}, compiled {actual}")]
    SchemaMismatch {
        /// Fingerprint from the configuration.
        expected: String,
        /// Fingerprint of the compiled table.
        actual: String,
    },

    /// The operation is not allowed in the current session state.
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        /// Current state.
        state: SessionState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Encoding or decoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The link failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<MessengerError> for SessionError {
    fn from(err: MessengerError) -> Self {
        match err {
            MessengerError::Protocol(e) => SessionError::Protocol(e),
            MessengerError::Transport(e) => SessionError::Transport(e),
        }
    }
}

/// Errors loading a rig configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid YAML for [`crate::RigConfig`].
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An out-of-range value.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
