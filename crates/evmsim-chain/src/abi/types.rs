//! ABI type definitions

use evmsim_primitives::{Address, U256};

/// Solidity ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Address (20 bytes)
    Address(Address),
    /// Unsigned integer
    Uint(U256),
    /// Signed integer, already in two's complement
    Int(U256),
    /// Boolean
    Bool(bool),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// Fixed-size bytes (1-32), left aligned
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Dynamic array
    Array(Vec<Token>),
    /// Fixed-size array
    FixedArray(Vec<Token>),
}

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Address
    Address,
    /// Unsigned integer with bit size (8, 16, ..., 256)
    Uint(usize),
    /// Signed integer with bit size
    Int(usize),
    /// Boolean
    Bool,
    /// Dynamic bytes
    Bytes,
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// UTF-8 string
    String,
    /// Dynamic array
    Array(Box<ParamType>),
    /// Fixed-size array
    FixedArray(Box<ParamType>, usize),
}

impl ParamType {
    /// Check if this type is dynamic (variable length)
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head
    pub fn head_length(&self) -> usize {
        match self {
            ParamType::FixedArray(inner, size) if !inner.is_dynamic() => inner.head_length() * size,
            _ => 32,
        }
    }
}
