//! Cryptographic errors

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Signing failed
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Signature bytes do not form a valid signature
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Recovery id is not 0/1 (or 27/28)
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Public key could not be recovered
    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),

    /// Private key bytes are malformed or out of range
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}
