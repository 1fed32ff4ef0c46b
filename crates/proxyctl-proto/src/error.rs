//! protocol error types.

use thiserror::Error;

/// errors that can occur in channel protocol operations.
#[derive(Debug, Error)]
pub enum Error {
    /// a frame could not be decoded.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// a frame could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}
