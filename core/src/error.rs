//! Error types for request encoding and transport failures.
//!
//! # Design
//! Encoding failures are the only errors `Session::send` can return: they
//! surface synchronously, before any network I/O starts. Transport failures
//! never surface as `Err`; they ride inside the constructed response so a
//! single completion path handles success and failure uniformly.

use std::fmt;

/// Errors from framing a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A field value has no JSON representation, such as a non-finite float.
    UnrepresentableJson { field: String },

    /// The encoded payload could not be serialized.
    Serialization(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnrepresentableJson { field } => {
                write!(f, "field {field:?} has no JSON representation")
            }
            EncodeError::Serialization(msg) => {
                write!(f, "serialization failed: {msg}")
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// A failure reported by the transport, delivered inside the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The trust policy refused the credential offered by this host.
    TrustRejected { host: String },

    /// Any other transport-level failure, message passed through verbatim.
    Failed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::TrustRejected { host } => {
                write!(f, "server trust rejected for {host}")
            }
            TransportError::Failed(msg) => write!(f, "transport failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}
