//! Step hooks: the seam through which a debugger observes execution
//!
//! The executor calls these around every opcode. All methods default to
//! no-ops so plain execution uses [`NoHook`] and pays nothing.

use crate::interpreter::Interpreter;
use evmsim_primitives::{Address, U256};
use evmsim_state::WorldState;

/// Observer of frame execution
pub trait StepHook {
    /// A frame is about to run its first opcode
    fn frame_started(&mut self, _frame: &Interpreter, _state: &WorldState) {}

    /// A child frame started by the opcode just executed has returned
    fn frame_resumed(&mut self, _frame: &Interpreter, _state: &WorldState) {}

    /// The opcode at `frame.pc()` is about to execute
    ///
    /// Returning false refuses the step and aborts execution. Once a step
    /// is granted it runs to its [`after_step`](Self::after_step), even if
    /// an abort arrives in between.
    fn before_step(&mut self, _frame: &Interpreter, _state: &WorldState) -> bool {
        true
    }

    /// An SSTORE wrote `value` to `slot` of `address`
    fn storage_written(&mut self, _address: Address, _slot: U256, _value: U256) {}

    /// The opcode finished; `frame.last_gas_cost()` holds its cost
    fn after_step(&mut self, _frame: &Interpreter, _state: &WorldState) {}

    /// Checked before every opcode
    fn is_aborted(&self) -> bool {
        false
    }

    /// Execution stopped because [`is_aborted`](Self::is_aborted) returned true
    fn aborted(&mut self) {}
}

/// Hook for plain, unobserved execution
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHook;

impl StepHook for NoHook {}

impl<H: StepHook + ?Sized> StepHook for &mut H {
    fn frame_started(&mut self, frame: &Interpreter, state: &WorldState) {
        (**self).frame_started(frame, state)
    }

    fn frame_resumed(&mut self, frame: &Interpreter, state: &WorldState) {
        (**self).frame_resumed(frame, state)
    }

    fn before_step(&mut self, frame: &Interpreter, state: &WorldState) -> bool {
        (**self).before_step(frame, state)
    }

    fn storage_written(&mut self, address: Address, slot: U256, value: U256) {
        (**self).storage_written(address, slot, value)
    }

    fn after_step(&mut self, frame: &Interpreter, state: &WorldState) {
        (**self).after_step(frame, state)
    }

    fn is_aborted(&self) -> bool {
        (**self).is_aborted()
    }

    fn aborted(&mut self) {
        (**self).aborted()
    }
}
