//! Tagged EVM stack
//!
//! Values keep the form they were pushed in: PUSHn and opcodes that produce
//! addresses or hashes push raw bytes, everything else pushes integers. The
//! distinction only matters for display; arithmetic reads both the same way.

use crate::error::{EvmError, EvmResult};
use crate::gas::cost::MAX_STACK_SIZE;
use evmsim_primitives::{bytes_to_hex, word_to_hex, Address};
use primitive_types::U256;
use std::fmt;

/// One stack entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackValue {
    /// Result of arithmetic or an environment query
    Integer(U256),
    /// Raw bytes, big-endian, at most 32
    Bytes(Vec<u8>),
}

impl StackValue {
    /// Numeric value
    pub fn as_u256(&self) -> U256 {
        match self {
            StackValue::Integer(value) => *value,
            StackValue::Bytes(bytes) => {
                let start = bytes.len().saturating_sub(32);
                U256::from_big_endian(&bytes[start..])
            }
        }
    }

    /// Address stored in the low 20 bytes
    pub fn as_address(&self) -> Address {
        Address::from_word(self.as_u256())
    }

    /// Even-length hex rendering, `0x` prefixed
    pub fn to_hex(&self) -> String {
        match self {
            StackValue::Integer(value) => word_to_hex(value),
            StackValue::Bytes(bytes) => bytes_to_hex(bytes),
        }
    }
}

impl From<U256> for StackValue {
    fn from(value: U256) -> Self {
        StackValue::Integer(value)
    }
}

impl From<Address> for StackValue {
    fn from(address: Address) -> Self {
        StackValue::Bytes(address.as_bytes().to_vec())
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// EVM stack (max 1024 items)
#[derive(Clone, Debug, Default)]
pub struct Stack {
    data: Vec<StackValue>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(64),
        }
    }

    /// Push a value
    pub fn push(&mut self, value: impl Into<StackValue>) -> EvmResult<()> {
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(EvmError::StackOverflow);
        }
        self.data.push(value.into());
        Ok(())
    }

    /// Push raw bytes
    pub fn push_bytes(&mut self, bytes: Vec<u8>) -> EvmResult<()> {
        self.push(StackValue::Bytes(bytes))
    }

    /// Push a boolean as 0 or 1
    pub fn push_bool(&mut self, value: bool) -> EvmResult<()> {
        self.push(if value { U256::one() } else { U256::zero() })
    }

    /// Pop the top value
    pub fn pop(&mut self) -> EvmResult<StackValue> {
        self.data.pop().ok_or(EvmError::StackUnderflow)
    }

    /// Pop the top value as an integer
    pub fn pop_u256(&mut self) -> EvmResult<U256> {
        self.pop().map(|v| v.as_u256())
    }

    /// Pop `N` integers, top first
    pub fn pop_n<const N: usize>(&mut self) -> EvmResult<[U256; N]> {
        if self.data.len() < N {
            return Err(EvmError::StackUnderflow);
        }
        let mut out = [U256::zero(); N];
        for slot in out.iter_mut() {
            *slot = self.pop_u256()?;
        }
        Ok(out)
    }

    /// Value at `depth` (0 = top)
    pub fn peek(&self, depth: usize) -> EvmResult<&StackValue> {
        if depth >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        Ok(&self.data[self.data.len() - 1 - depth])
    }

    /// Duplicate the item at 1-based `depth` onto the top
    pub fn dup(&mut self, depth: usize) -> EvmResult<()> {
        if depth == 0 || depth > self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let value = self.data[self.data.len() - depth].clone();
        self.push(value)
    }

    /// Exchange the top with the item `depth` below it
    pub fn swap(&mut self, depth: usize) -> EvmResult<()> {
        if depth == 0 || depth >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Items bottom to top
    pub fn values(&self) -> &[StackValue] {
        &self.data
    }

    /// Hex rendering of the top `n` items, top first
    pub fn top_hex(&self, n: usize) -> Vec<String> {
        self.data.iter().rev().take(n).map(StackValue::to_hex).collect()
    }
}
