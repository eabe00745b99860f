//! # evmsim-chain
//!
//! Single-node simulated chain for the EVM debugger.
//!
//! This crate provides:
//! - [`Chain`]: signed legacy transactions executed against one world state,
//!   collected into PoW-mined blocks
//! - [`EvmHandler`]: the facade a front end drives (send wei, deploy, call,
//!   read and edit state)
//! - [`abi`]: encoding of user-typed call arguments
//! - [`ChainConfig`]: genesis and transaction defaults

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
mod chain;
mod config;
mod error;
mod handler;

pub use abi::{AbiArg, RAW_DATA_SIGNATURE};
pub use chain::Chain;
pub use config::{ChainConfig, DEFAULT_MASTER_KEY};
pub use error::{ChainError, ChainResult};
pub use handler::EvmHandler;
