//! # evmsim-debugger
//!
//! Opcode-level debugging sessions over the simulated chain.
//!
//! This crate provides:
//! - [`predict`]: the effects of the next opcode on the stack, memory,
//!   storage and account list, as a [`ChangeChain`]
//! - [`SlotIndex`]: stable display indices of storage slots
//! - [`History`]: a replayable record of executed steps
//! - [`Debugger`]: a single worker thread running chain jobs, with every
//!   opcode of a create or call published on an [`EventStream`] and gated by
//!   a [`DebugHandle`]
//!
//! ## Session protocol
//!
//! For each opcode the observer receives, in order:
//! 1. [`Event::ChangeChainReady`]
//! 2. [`Event::PreStep`], which must be acknowledged
//! 3. any [`Event::StorageUpdated`] the opcode caused
//! 4. [`Event::PostStep`], which must be acknowledged
//!
//! In step mode each opcode also consumes one permit granted through
//! [`DebugHandle::grant_steps`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod accessors;
mod changes;
mod controller;
mod effects;
mod error;
mod events;
mod predictor;
mod session;
mod slots;
mod worker;

pub use accessors::{slot_key, word_range, MemoryView, StackView, StorageView, WORD_SIZE};
pub use changes::{ChangeChain, ChangeLink, History, HistoryEntry, StepSnapshot, StorageDelta};
pub use effects::{stack_effect, stack_effect_of, Component, Indices, StackEffect};
pub use error::{DebugError, DebugResult};
pub use events::{Ack, Event, EventStream, FrameInfo, Notification};
pub use predictor::{predict, FrameContext, Prediction, SlotAccess};
pub use session::{DebugMode, SessionConfig, StepGate};
pub use slots::SlotIndex;
pub use worker::{DebugHandle, Debugger, Job, JobOutput, JobTicket};
