//! # evmsim-evm
//!
//! EVM execution engine for the simulator.
//!
//! This crate provides:
//! - The Istanbul opcode table, gas schedule and precompiles
//! - A tagged stack and word-addressed memory
//! - The single-frame [`Interpreter`] and the message [`Evm`] executor
//! - The [`StepHook`] seam a debugger uses to observe every opcode
//! - A small label-resolving [`Assembler`] for hand-written bytecode

#![warn(missing_docs)]
#![warn(clippy::all)]

mod arith;
pub mod asm;
mod context;
mod error;
mod executor;
pub mod gas;
mod hook;
mod interpreter;
mod memory;
pub mod opcode;
pub mod precompiles;
mod stack;

pub use asm::{deployer, AsmError, Assembler};
pub use context::{BlockEnv, CallKind, Message, TxEnv};
pub use error::{EvmError, EvmResult, ExecStatus, ExecutionResult};
pub use executor::Evm;
pub use hook::{NoHook, StepHook};
pub use interpreter::{create2_address, create_address, Host, Interpreter, StepOutcome};
pub use memory::Memory;
pub use opcode::{disassemble, instruction_index, mnemonic, Instruction, Opcode};
pub use stack::{Stack, StackValue};
