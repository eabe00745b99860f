//! # evmsim-primitives
//!
//! Primitive types shared by every crate of the EVM simulator.
//!
//! - [`Address`]: 20-byte account address
//! - [`H256`]: 32-byte hash / storage key
//! - [`U256`]: 256-bit machine word (re-exported from `primitive-types`)
//! - hex helpers used for display of words and storage slots

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod format;
mod hash;

pub use address::Address;
pub use error::{PrimitiveError, PrimitiveResult};
pub use format::{bytes_to_hex, decode_hex, parse_u128, parse_word, word_to_hex};
pub use hash::H256;

pub use primitive_types::U256;

/// Block number type
pub type BlockNumber = u64;

/// Account nonce type
pub type Nonce = u64;

/// Gas amount type
pub type Gas = u64;

/// One ether in wei
pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// One finney in wei
pub const FINNEY: u128 = 1_000_000_000_000_000;
