//! Chain and handler errors

use evmsim_crypto::CryptoError;
use evmsim_primitives::PrimitiveError;
use evmsim_state::StateError;
use thiserror::Error;

/// Errors raised before or around transaction execution
///
/// Execution faults and reverts are not errors; they are reported through
/// the receipt and the [`ExecutionResult`](evmsim_evm::ExecutionResult).
#[derive(Debug, Error)]
pub enum ChainError {
    /// Malformed user input (address, number, hex)
    #[error("validation error: {0}")]
    Validation(String),

    /// Call arguments could not be ABI encoded
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Transaction nonce does not match the sender account
    #[error("nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch {
        /// Account nonce
        expected: u64,
        /// Transaction nonce
        got: u64,
    },

    /// Sender cannot pay for gas and value
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// gas_limit * gas_price + value
        required: u128,
        /// Sender balance
        available: u128,
    },

    /// Gas limit below the intrinsic cost
    #[error("intrinsic gas too low: need {need}, limit {limit}")]
    IntrinsicGas {
        /// Intrinsic gas
        need: u64,
        /// Transaction gas limit
        limit: u64,
    },

    /// Transaction would exceed the block gas limit
    #[error("block gas limit exceeded: used {used}, limit {limit}")]
    BlockGasLimitExceeded {
        /// Gas after including the transaction
        used: u64,
        /// Block gas limit
        limit: u64,
    },

    /// Transaction signed for another chain
    #[error("wrong chain id: expected {expected}, got {got:?}")]
    WrongChainId {
        /// Chain id of this chain
        expected: u64,
        /// Chain id in the signature
        got: Option<u64>,
    },

    /// Signing or recovery failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// World-state failure
    #[error("state error: {0}")]
    State(#[from] StateError),
}

impl From<PrimitiveError> for ChainError {
    fn from(e: PrimitiveError) -> Self {
        ChainError::Validation(e.to_string())
    }
}

/// Result alias for chain operations
pub type ChainResult<T> = Result<T, ChainError>;
