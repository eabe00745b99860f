//! CLI error types

use thiserror::Error;

/// Malformed command-line input
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Call argument not written as `type=value`
    #[error("Invalid argument: {0} (expected TYPE=VALUE)")]
    InvalidArgument(String),

    /// Config file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
