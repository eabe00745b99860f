//! Execution context: messages, block and transaction environment

use evmsim_primitives::{Address, H256, U256};
use std::fmt;

/// Kind of frame a message starts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// CALL or a top-level call transaction
    Call,
    /// CALLCODE
    CallCode,
    /// DELEGATECALL
    DelegateCall,
    /// STATICCALL
    StaticCall,
    /// CREATE or a contract creation transaction
    Create,
    /// CREATE2
    Create2 {
        /// Salt
        salt: U256,
    },
}

impl CallKind {
    /// Whether the message deploys code
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2 { .. })
    }

    /// Whether the message moves value from caller to target
    pub fn transfers_value(&self) -> bool {
        !matches!(self, CallKind::DelegateCall | CallKind::StaticCall)
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::Call => "call",
            CallKind::CallCode => "callcode",
            CallKind::DelegateCall => "delegatecall",
            CallKind::StaticCall => "staticcall",
            CallKind::Create => "create",
            CallKind::Create2 { .. } => "create2",
        };
        f.write_str(name)
    }
}

/// Input of one frame
#[derive(Clone, Debug)]
pub struct Message {
    /// Frame kind
    pub kind: CallKind,
    /// CALLER
    pub caller: Address,
    /// ADDRESS: account whose storage and balance the frame uses
    pub target: Address,
    /// Account whose code runs; equal to `target` except for CALLCODE and DELEGATECALL
    pub code_address: Address,
    /// CALLVALUE
    pub value: u128,
    /// Call data, or init code for creations
    pub data: Vec<u8>,
    /// Gas available to the frame
    pub gas: u64,
    /// 0 for the transaction's own frame
    pub depth: usize,
    /// Set inside STATICCALL
    pub is_static: bool,
}

impl Message {
    /// Top-level call from `caller` to `to`
    pub fn call(caller: Address, to: Address, value: u128, data: Vec<u8>, gas: u64) -> Self {
        Self {
            kind: CallKind::Call,
            caller,
            target: to,
            code_address: to,
            value,
            data,
            gas,
            depth: 0,
            is_static: false,
        }
    }

    /// Top-level creation of `target` from `caller`
    pub fn create(caller: Address, target: Address, value: u128, init_code: Vec<u8>, gas: u64) -> Self {
        Self {
            kind: CallKind::Create,
            caller,
            target,
            code_address: target,
            value,
            data: init_code,
            gas,
            depth: 0,
            is_static: false,
        }
    }

    /// Whether this frame deploys code
    pub fn is_create(&self) -> bool {
        self.kind.is_create()
    }
}

/// Block environment
#[derive(Clone, Debug)]
pub struct BlockEnv {
    /// NUMBER
    pub number: u64,
    /// TIMESTAMP
    pub timestamp: u64,
    /// GASLIMIT
    pub gas_limit: u64,
    /// COINBASE
    pub coinbase: Address,
    /// DIFFICULTY
    pub difficulty: U256,
    /// CHAINID
    pub chain_id: u64,
    /// Hashes of the most recent blocks, oldest first; the last is the parent
    pub recent_hashes: Vec<H256>,
}

impl Default for BlockEnv {
    fn default() -> Self {
        Self {
            number: 1,
            timestamp: 0,
            gas_limit: u64::MAX,
            coinbase: Address::ZERO,
            difficulty: U256::one(),
            chain_id: 1337,
            recent_hashes: Vec::new(),
        }
    }
}

impl BlockEnv {
    /// BLOCKHASH for one of the 256 most recent blocks
    pub fn block_hash(&self, number: u64) -> H256 {
        if number >= self.number {
            return H256::ZERO;
        }
        let age = self.number - number;
        if age > 256 || age as usize > self.recent_hashes.len() {
            return H256::ZERO;
        }
        self.recent_hashes[self.recent_hashes.len() - age as usize]
    }
}

/// Transaction environment
#[derive(Clone, Debug, Default)]
pub struct TxEnv {
    /// ORIGIN
    pub origin: Address,
    /// GASPRICE
    pub gas_price: u128,
}
