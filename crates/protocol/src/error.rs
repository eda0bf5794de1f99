//! Error types for the protocol crate.

use thiserror::Error;

use crate::message::MessageType;

/// Protocol error type covering all possible failure modes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    // Wire format errors
    /// Malformed or truncated wire bytes.
    #[error("malformed message: {0}")]
    Format(String),

    // Key errors
    /// Invalid key bytes, invalid curve point, or a failed key generation.
    #[error("key error: {0}")]
    Key(String),

    // Integrity errors
    /// The message MAC did not verify.
    #[error("message authentication failed")]
    Authentication,

    /// The message timestamp is outside the accepted skew window.
    #[error("message timestamp outside tolerance: age {age}s exceeds {tolerance}s")]
    Timestamp {
        /// Age of the message in seconds (negative if from the future).
        age: i64,
        /// Accepted skew in seconds.
        tolerance: i64,
    },

    /// AEAD decryption failed.
    ///
    /// Carries no detail: a short input and a bad tag are indistinguishable.
    #[error("decryption failed")]
    Decryption,

    /// AEAD encryption or nonce generation failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    // Protocol flow errors
    /// A message of the wrong type arrived for the current step.
    #[error("unexpected message: expected {expected:?}, got type {got:#04x}")]
    UnexpectedMessage {
        /// The message type the current step requires.
        expected: MessageType,
        /// The raw type byte received.
        got: u8,
    },

    /// The message carries a protocol version this implementation does not speak.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    // State errors
    /// Attempted to use the session before the handshake finished.
    #[error("not connected: cannot perform operation before a session is established")]
    NotConnected,

    /// The operation is not allowed in the current handshake or channel state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    // Collaborator errors
    /// The compression strategy failed.
    #[error("compression failed: {0}")]
    Compression(String),
}

/// Broad failure categories, for callers that branch on the kind of error
/// rather than its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed wire bytes.
    Format,
    /// Invalid key material.
    Key,
    /// MAC mismatch.
    Authentication,
    /// Message age outside tolerance.
    Timestamp,
    /// AEAD failure.
    Decryption,
    /// Wrong message for the current step.
    Protocol,
    /// Operation not allowed in the current state.
    State,
    /// Local cryptographic or compression failure.
    Internal,
}

impl ProtocolError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Format(_) => ErrorKind::Format,
            ProtocolError::Key(_) => ErrorKind::Key,
            ProtocolError::Authentication => ErrorKind::Authentication,
            ProtocolError::Timestamp { .. } => ErrorKind::Timestamp,
            ProtocolError::Decryption => ErrorKind::Decryption,
            ProtocolError::UnexpectedMessage { .. } | ProtocolError::UnsupportedVersion(_) => {
                ErrorKind::Protocol
            }
            ProtocolError::NotConnected | ProtocolError::InvalidState(_) => ErrorKind::State,
            ProtocolError::Encryption(_) | ProtocolError::Compression(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

// Conversions from underlying crate errors

impl From<hmac::digest::InvalidLength> for ProtocolError {
    fn from(err: hmac::digest::InvalidLength) -> Self {
        ProtocolError::Key(format!("invalid MAC key: {}", err))
    }
}

impl From<lz4_flex::block::DecompressError> for ProtocolError {
    fn from(err: lz4_flex::block::DecompressError) -> Self {
        ProtocolError::Compression(err.to_string())
    }
}
