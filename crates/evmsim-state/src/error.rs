//! State errors

use evmsim_primitives::Address;
use thiserror::Error;

/// World-state error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Balance too low for a debit
    #[error("insufficient balance for {address}: need {needed}, have {available}")]
    InsufficientBalance {
        /// Debited account
        address: Address,
        /// Requested amount
        needed: u128,
        /// Current balance
        available: u128,
    },

    /// Balance would exceed u128::MAX
    #[error("balance overflow for {0}")]
    BalanceOverflow(Address),

    /// Nonce would exceed u64::MAX
    #[error("nonce overflow for {0}")]
    NonceOverflow(Address),

    /// Snapshot id was already committed or reverted
    #[error("unknown snapshot {0}")]
    UnknownSnapshot(usize),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
