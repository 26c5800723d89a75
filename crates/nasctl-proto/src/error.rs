//! Error types for the nasctl-proto crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Failed to encode a message.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failed to decode a message.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// A response payload did not have the expected shape.
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),
}
