//! # evmsim-types
//!
//! Transaction, receipt and block types of the simulated chain.
//!
//! Only legacy (EIP-155 replay protected) transactions exist; the simulator
//! signs every transaction it sends with the master account key.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod receipt;
mod transaction;

pub use block::{ordered_root, seal_value, Block, BlockHeader, EMPTY_ROOT};
pub use receipt::{Log, Receipt, TxStatus};
pub use transaction::{LegacyTx, SignedTransaction, TxSignature};
