//! Step controller
//!
//! Plugs into the executor as a [`StepHook`] and turns every opcode into a
//! two-phase handshake with the observer: effects and pre-step state are
//! published and acknowledged before the opcode runs, post-step state after.
//! The next opcode never starts before the previous post-step was
//! acknowledged.

use crate::accessors::{slot_key, MemoryView, StackView, StorageView};
use crate::changes::{History, StepSnapshot, StorageDelta};
use crate::events::{Event, FrameInfo, Publisher};
use crate::predictor::{predict, FrameContext};
use crate::session::{DebugMode, SessionConfig, StepGate};
use crate::slots::SlotIndex;
use evmsim_evm::{disassemble, instruction_index, Instruction, Interpreter, Opcode, StepHook};
use evmsim_primitives::{word_to_hex, Address, U256};
use evmsim_state::WorldState;
use parking_lot::Mutex;

/// Where the controller is in the per-opcode handshake
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ControllerState {
    /// Executing, or between opcodes
    Running,
    /// Pre-step published, waiting for the observer
    AwaitingPreAck,
    /// Post-step published, waiting for the observer
    AwaitingPostAck,
    /// The session ended
    Halted,
}

/// Code shown for one active frame
struct FrameView {
    disassembly: Vec<Instruction>,
}

/// Step hook driving one debugging session
pub(crate) struct StepController<'a> {
    config: SessionConfig,
    gate: &'a StepGate,
    publisher: &'a Publisher,
    slots: &'a mut SlotIndex,
    history: &'a Mutex<History>,
    accounts: Vec<Address>,
    frames: Vec<FrameView>,
    /// Open history entry per call depth
    open: Vec<Option<usize>>,
    /// Entry of the opcode executing now
    writing: Option<usize>,
    state: ControllerState,
    aborted: bool,
}

impl<'a> StepController<'a> {
    pub(crate) fn new(
        config: SessionConfig,
        gate: &'a StepGate,
        publisher: &'a Publisher,
        slots: &'a mut SlotIndex,
        history: &'a Mutex<History>,
        accounts: Vec<Address>,
    ) -> Self {
        Self {
            config,
            gate,
            publisher,
            slots,
            history,
            accounts,
            frames: Vec::new(),
            open: Vec::new(),
            writing: None,
            state: ControllerState::Running,
            aborted: false,
        }
    }

    pub(crate) fn was_aborted(&self) -> bool {
        self.aborted
    }

    /// Mark the session over
    pub(crate) fn halt(&mut self) {
        self.state = ControllerState::Halted;
    }

    fn active(&self) -> bool {
        self.config.mode.is_active()
    }

    /// Publish, blocking on the observer only while debugging
    fn publish_storage(&self, address: Address, slot: U256, value: U256, index: usize) {
        let event = Event::StorageUpdated {
            address,
            slot: slot_key(&slot),
            value: word_to_hex(&value),
            index,
        };
        if self.active() {
            self.publisher.rendezvous(event);
        } else {
            self.publisher.notify(event);
        }
    }

    fn show(&self, frame: &Interpreter) {
        if let Some(view) = self.frames.last() {
            self.publisher.rendezvous(Event::SessionInitialized {
                code: frame.code().to_vec(),
                disassembly: view.disassembly.clone(),
                frame: FrameInfo::of(frame),
            });
        }
    }

    /// Track `entry` as the open step of the frame at `depth`
    ///
    /// Entries left open deeper down belong to frames that ended without a
    /// post-step and are dropped.
    fn open_entry(&mut self, depth: usize, entry: usize) {
        self.open.resize(depth + 1, None);
        self.open[depth] = Some(entry);
        self.writing = Some(entry);
    }

    /// Wait for the permission to run the next opcode
    fn wait_turn(&self) -> bool {
        match self.config.mode {
            DebugMode::None => !self.gate.is_aborted(),
            DebugMode::Step => self.gate.acquire(),
            DebugMode::Auto => self.gate.pause(self.config.step_delay()),
        }
    }
}

fn snapshot(frame: &Interpreter) -> StepSnapshot {
    StepSnapshot {
        pc: frame.pc(),
        gas_remaining: frame.gas_remaining(),
        stack: StackView::new(frame.stack()).top_first(),
        memory: MemoryView::new(frame.memory()).bytes().to_vec(),
    }
}

impl StepHook for StepController<'_> {
    fn frame_started(&mut self, frame: &Interpreter, _state: &WorldState) {
        tracing::debug!(
            "Frame started: depth={} target={}",
            frame.message().depth,
            frame.message().target
        );
        self.frames.push(FrameView {
            disassembly: disassemble(frame.code()),
        });
        if self.active() && !self.gate.is_aborted() {
            self.show(frame);
        }
    }

    fn frame_resumed(&mut self, frame: &Interpreter, _state: &WorldState) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
        tracing::debug!("Frame resumed: depth={}", frame.message().depth);
        if self.active() && !self.aborted {
            self.show(frame);
        }
    }

    fn before_step(&mut self, frame: &Interpreter, state: &WorldState) -> bool {
        if !self.wait_turn() {
            return false;
        }
        let Some(byte) = frame.current_opcode() else {
            return true;
        };

        let address = frame.message().target;
        let row = self
            .frames
            .last()
            .and_then(|view| instruction_index(&view.disassembly, frame.pc()));
        let context = FrameContext {
            address,
            row,
            accounts: &self.accounts,
        };
        let prediction = predict(byte, &StackView::new(frame.stack()), &context, self.slots);
        tracing::trace!("pc={} {} {} links", frame.pc(), prediction.mnemonic, prediction.chain.len());

        if byte == Opcode::SLOAD.as_byte() {
            if let Some(access) = prediction.slot.filter(|access| access.registered) {
                let value = StorageView::new(state, address).get(&access.slot);
                self.publish_storage(address, access.slot, value, access.index);
            }
        }

        if !self.active() {
            return true;
        }

        let depth = frame.message().depth;
        let entry = self
            .history
            .lock()
            .begin_step(depth, byte, prediction.chain.clone(), snapshot(frame));
        self.open_entry(depth, entry);
        self.publisher.notify(Event::ChangeChainReady {
            mnemonic: prediction.mnemonic,
            chain: prediction.chain,
        });

        self.state = ControllerState::AwaitingPreAck;
        self.publisher.rendezvous(Event::PreStep {
            gas_remaining: frame.gas_remaining(),
            pc: frame.pc(),
        });
        self.state = ControllerState::Running;
        true
    }

    fn storage_written(&mut self, address: Address, slot: U256, value: U256) {
        let index = self.slots.expect_index(&address, &slot);
        if let Some(entry) = self.writing.filter(|_| self.active()) {
            self.history.lock().record_storage(
                entry,
                StorageDelta {
                    address,
                    slot,
                    value,
                    index,
                },
            );
        }
        self.publish_storage(address, slot, value, index);
    }

    fn after_step(&mut self, frame: &Interpreter, _state: &WorldState) {
        if !self.active() {
            return;
        }
        let post = snapshot(frame);
        let depth = frame.message().depth;
        if let Some(entry) = self.open.get_mut(depth).and_then(Option::take) {
            self.history.lock().finish_step(entry, post.clone(), frame.last_gas_cost());
        }

        self.state = ControllerState::AwaitingPostAck;
        self.publisher.rendezvous(Event::PostStep {
            stack: post.stack,
            memory: post.memory,
            pc: post.pc,
            gas_cost: frame.last_gas_cost(),
        });
        self.state = ControllerState::Running;
    }

    fn is_aborted(&self) -> bool {
        self.gate.is_aborted()
    }

    fn aborted(&mut self) {
        if self.aborted {
            return;
        }
        tracing::warn!("Session aborted by the observer while {:?}", self.state);
        self.aborted = true;
        self.state = ControllerState::Halted;
        self.publisher.notify(Event::Aborted);
    }
}
