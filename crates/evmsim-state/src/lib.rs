//! # evmsim-state
//!
//! The single mutable world state of the simulated chain.
//!
//! Accounts, contract code and storage live in memory. Nested call frames
//! take a snapshot on entry and either commit or revert it on exit, so a
//! fault, a REVERT or a user abort never leaves partial effects behind.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod error;
mod traits;
mod world;

pub use account::{Account, EMPTY_CODE_HASH};
pub use error::{StateError, StateResult};
pub use traits::{StateReader, StateWriter};
pub use world::{SnapshotId, WorldState};
