//! Error types for the command-messenger protocol.

use thiserror::Error;

/// A malformed field token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Token is not a decimal number of the expected type.
    #[error("not a numeric field: {0:?}")]
    NotNumeric(String),

    /// Token is not one of the boolean sentinels.
    #[error("not a boolean field: {0:?}")]
    NotBoolean(String),

    /// An array's text carries more tokens than its capacity holds.
    #[error("{0} tokens past the end of the array")]
    TrailingTokens(usize),

    /// Token ends with an unpaired escape character.
    #[error("field ends in the middle of an escape sequence")]
    DanglingEscape,
}

/// Identifies a command by name or by numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRef {
    /// Symbolic command name.
    Name(String),
    /// Numeric wire identifier.
    Id(u16),
}

impl std::fmt::Display for CommandRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandRef::Name(name) => write!(f, "'{}'", name),
            CommandRef::Id(id) => write!(f, "id {}", id),
        }
    }
}

/// Errors local to a single frame or command table operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// No command registered under this name or id.
    #[error("unknown command: {0}")]
    UnknownCommand(CommandRef),

    /// A name was registered twice.
    #[error("duplicate command name: {0}")]
    DuplicateCommand(String),

    /// Every wire id is taken; the named entry could not be registered.
    #[error("command table full, cannot register '{0}'")]
    TableFull(String),

    /// Arguments do not match the registered signature.
    #[error("arguments for '{command}' do not match its signature: {detail}")]
    ArityOrTypeMismatch {
        /// Command being encoded.
        command: String,
        /// What did not match.
        detail: String,
    },

    /// A field failed to decode.
    #[error("field {index} of '{command}' failed to decode: {source}")]
    FieldDecodeError {
        /// Command being decoded.
        command: String,
        /// Zero-based wire token index.
        index: usize,
        /// Underlying format error.
        #[source]
        source: FormatError,
    },

    /// The frame carries a different number of tokens than the signature needs.
    #[error("'{command}' expects {expected} fields, frame has {actual}")]
    FieldCount {
        /// Command being decoded.
        command: String,
        /// Tokens required by the signature.
        expected: usize,
        /// Tokens present in the frame.
        actual: usize,
    },

    /// The frame identifier is missing or not a plain decimal integer.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

/// Errors raised by the byte transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// I/O error on the underlying link.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link has been closed.
    #[error("transport closed")]
    Closed,
}

/// Errors from operations that both encode and write a frame.
#[derive(Error, Debug)]
pub enum MessengerError {
    /// Encoding failed before anything was written.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Writing the encoded frame failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
