//! EVM error types and execution outcomes

use evmsim_primitives::Address;
use evmsim_state::StateError;
use evmsim_types::Log;
use std::fmt;
use thiserror::Error;

/// Faults that terminate a frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow
    #[error("stack overflow (max 1024)")]
    StackOverflow,

    /// Jump target is not a JUMPDEST
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Unassigned opcode or INVALID
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// State change inside STATICCALL
    #[error("state modification in static context")]
    StaticCallViolation,

    /// RETURNDATACOPY past the end of the return buffer
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// CREATE target already has code or a nonce
    #[error("contract address collision")]
    CreateCollision,

    /// Deployed code larger than 24576 bytes
    #[error("max code size exceeded (limit: 24576 bytes)")]
    MaxCodeSizeExceeded,

    /// Nesting deeper than 1024 frames
    #[error("call depth exceeded (max 1024)")]
    CallDepthExceeded,

    /// Value transfer exceeds the sender's balance
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Precompile rejected its input
    #[error("precompile error: {0}")]
    PrecompileError(String),

    /// World-state failure
    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;

/// How a frame ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    /// STOP, RETURN or end of code
    Success,
    /// REVERT
    Revert,
    /// Unrecoverable fault; all gas is consumed
    Fault(EvmError),
    /// The debugging session was aborted
    Aborted,
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecStatus::Success => f.write_str("success"),
            ExecStatus::Revert => f.write_str("reverted"),
            ExecStatus::Fault(error) => write!(f, "fault ({})", error),
            ExecStatus::Aborted => f.write_str("aborted"),
        }
    }
}

/// Outcome of a message call or contract creation
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// How the frame ended
    pub status: ExecStatus,
    /// Gas consumed, refund not yet applied
    pub gas_used: u64,
    /// Accumulated refund, zero unless successful
    pub gas_refund: u64,
    /// RETURN or REVERT data
    pub output: Vec<u8>,
    /// Logs, empty unless successful
    pub logs: Vec<Log>,
    /// Address of the created contract
    pub created_address: Option<Address>,
}

impl ExecutionResult {
    /// Successful result
    pub fn success(gas_used: u64, gas_refund: u64, output: Vec<u8>, logs: Vec<Log>) -> Self {
        Self {
            status: ExecStatus::Success,
            gas_used,
            gas_refund,
            output,
            logs,
            created_address: None,
        }
    }

    /// Reverted result; unused gas is returned
    pub fn revert(gas_used: u64, output: Vec<u8>) -> Self {
        Self {
            status: ExecStatus::Revert,
            gas_used,
            gas_refund: 0,
            output,
            logs: Vec::new(),
            created_address: None,
        }
    }

    /// Faulted result consuming `gas_limit`
    pub fn fault(error: EvmError, gas_limit: u64) -> Self {
        Self {
            status: ExecStatus::Fault(error),
            gas_used: gas_limit,
            gas_refund: 0,
            output: Vec::new(),
            logs: Vec::new(),
            created_address: None,
        }
    }

    /// Aborted result
    pub fn aborted(gas_used: u64) -> Self {
        Self {
            status: ExecStatus::Aborted,
            gas_used,
            gas_refund: 0,
            output: Vec::new(),
            logs: Vec::new(),
            created_address: None,
        }
    }

    /// Whether the frame succeeded
    pub fn is_success(&self) -> bool {
        self.status == ExecStatus::Success
    }

    /// Whether the session was aborted
    pub fn is_aborted(&self) -> bool {
        self.status == ExecStatus::Aborted
    }

    /// Fault, if any
    pub fn error(&self) -> Option<&EvmError> {
        match &self.status {
            ExecStatus::Fault(error) => Some(error),
            _ => None,
        }
    }
}
