//! Transaction receipts and logs

use bytes::Bytes;
use evmsim_primitives::{Address, H256};

/// Transaction execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Reverted, faulted or aborted
    Failure = 0,
    /// Succeeded
    Success = 1,
}

impl From<bool> for TxStatus {
    fn from(success: bool) -> Self {
        if success {
            TxStatus::Success
        } else {
            TxStatus::Failure
        }
    }
}

/// Log entry emitted by LOG0..LOG4
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<H256>,
    /// Payload
    pub data: Bytes,
}

impl Log {
    /// Create a new log entry
    pub fn new(address: Address, topics: Vec<H256>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

/// Transaction receipt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Outcome
    pub status: TxStatus,
    /// Gas used in the block up to and including this transaction
    pub cumulative_gas_used: u64,
    /// Gas charged to the sender
    pub gas_used: u64,
    /// Logs, empty unless the transaction succeeded
    pub logs: Vec<Log>,
    /// Created contract, if any
    pub contract_address: Option<Address>,
}

impl Receipt {
    /// Create a receipt without a contract address
    pub fn new(status: TxStatus, cumulative_gas_used: u64, gas_used: u64, logs: Vec<Log>) -> Self {
        Self {
            status,
            cumulative_gas_used,
            gas_used,
            logs,
            contract_address: None,
        }
    }

    /// Attach the created contract address
    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }

    /// Whether the transaction succeeded
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }
}
