//! Errors raised while parsing primitive values

use thiserror::Error;

/// Primitive parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// Input is not valid hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Byte length does not match the target type
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Length found
        got: usize,
    },

    /// Input is neither a decimal nor a `0x` hex number
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// Number does not fit the target width
    #[error("number out of range: {0}")]
    OutOfRange(String),
}

/// Result alias for primitive parsing
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;
