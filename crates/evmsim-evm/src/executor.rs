//! Message executor: runs frames to completion against world state

use crate::context::{BlockEnv, Message, TxEnv};
use crate::error::{EvmError, ExecutionResult};
use crate::gas::cost;
use crate::hook::{NoHook, StepHook};
use crate::interpreter::{Host, Interpreter, StepOutcome};
use crate::precompiles;
use evmsim_state::{StateReader, StateWriter, WorldState};

/// EVM bound to a world state, a block and a transaction
pub struct Evm<'a, H: StepHook = NoHook> {
    state: &'a mut WorldState,
    block: BlockEnv,
    tx: TxEnv,
    hook: H,
    frames_started: u64,
}

impl<'a> Evm<'a, NoHook> {
    /// Unobserved EVM
    pub fn new(state: &'a mut WorldState, block: BlockEnv, tx: TxEnv) -> Self {
        Self::with_hook(state, block, tx, NoHook)
    }
}

impl<'a, H: StepHook> Evm<'a, H> {
    /// EVM reporting every step to `hook`
    pub fn with_hook(state: &'a mut WorldState, block: BlockEnv, tx: TxEnv, hook: H) -> Self {
        Self {
            state,
            block,
            tx,
            hook,
            frames_started: 0,
        }
    }

    /// Number of frames that have run bytecode
    pub fn frames_started(&self) -> u64 {
        self.frames_started
    }

    /// Execute a message in its own snapshot
    ///
    /// State changes are kept only when the frame succeeds.
    pub fn execute(&mut self, message: Message) -> ExecutionResult {
        if message.depth > cost::MAX_CALL_DEPTH {
            return ExecutionResult::fault(EvmError::CallDepthExceeded, message.gas);
        }

        let snapshot = self.state.snapshot();
        let result = self.execute_inner(message);
        let settled = if result.is_success() {
            self.state.commit(snapshot)
        } else {
            self.state.revert(snapshot)
        };
        if let Err(e) = settled {
            tracing::warn!("Snapshot {:?} could not be settled: {}", snapshot, e);
        }
        result
    }

    fn execute_inner(&mut self, mut message: Message) -> ExecutionResult {
        let gas = message.gas;
        let target = message.target;
        let is_create = message.is_create();

        if is_create {
            if self.state.nonce(&target) > 0 || !self.state.code(&target).is_empty() {
                return ExecutionResult::fault(EvmError::CreateCollision, gas);
            }
            if let Err(e) = self.state.increment_nonce(&target) {
                return ExecutionResult::fault(e.into(), gas);
            }
        }

        if message.kind.transfers_value() && message.value > 0 {
            if let Err(e) = self.state.transfer(&message.caller, &target, message.value) {
                tracing::debug!("Value transfer failed: {}", e);
                return ExecutionResult::fault(EvmError::InsufficientBalance, gas);
            }
        }

        if !is_create {
            if let Some(outcome) = precompiles::run(&message.code_address, &message.data, gas) {
                return match outcome {
                    Ok((output, used)) => ExecutionResult::success(used, 0, output, Vec::new()),
                    Err(e) => ExecutionResult::fault(e, gas),
                };
            }
        }

        let code = if is_create {
            std::mem::take(&mut message.data)
        } else {
            self.state.code(&message.code_address)
        };

        if code.is_empty() {
            let mut result = ExecutionResult::success(0, 0, Vec::new(), Vec::new());
            if is_create {
                result.created_address = Some(target);
            }
            return result;
        }

        tracing::trace!(
            "Frame depth={} kind={} target={} gas={}",
            message.depth,
            message.kind,
            target,
            gas
        );
        let mut frame = Interpreter::new(message, code);
        self.frames_started += 1;
        self.hook.frame_started(&frame, &*self.state);
        let mut result = self.run(&mut frame);

        if is_create && result.is_success() {
            let deployed = std::mem::take(&mut result.output);
            if deployed.len() > cost::MAX_CODE_SIZE {
                return ExecutionResult::fault(EvmError::MaxCodeSizeExceeded, gas);
            }
            let deposit = deployed.len() as u64 * cost::CODE_DEPOSIT;
            if result.gas_used + deposit > gas {
                return ExecutionResult::fault(EvmError::OutOfGas, gas);
            }
            result.gas_used += deposit;
            self.state.set_code(target, deployed);
            result.created_address = Some(target);
        }
        result
    }

    fn run(&mut self, frame: &mut Interpreter) -> ExecutionResult {
        loop {
            if self.hook.is_aborted() {
                self.hook.aborted();
                return ExecutionResult::aborted(frame.gas_used());
            }
            if frame.is_finished() {
                return ExecutionResult::success(frame.gas_used(), frame.refund(), Vec::new(), frame.take_logs());
            }

            if !self.hook.before_step(frame, &*self.state) {
                self.hook.aborted();
                return ExecutionResult::aborted(frame.gas_used());
            }

            let preimage = frame.sstore_preimage();
            let frames_before = self.frames_started;
            let outcome = frame.step(self);
            if self.frames_started != frames_before {
                self.hook.frame_resumed(frame, &*self.state);
            }

            match outcome {
                Ok(StepOutcome::Continue) => {
                    if let Some((slot, value)) = preimage {
                        self.hook.storage_written(frame.message().target, slot, value);
                    }
                    self.hook.after_step(frame, &*self.state);
                }
                Ok(StepOutcome::Halt) => {
                    self.hook.after_step(frame, &*self.state);
                    let output = frame.take_output();
                    return ExecutionResult::success(frame.gas_used(), frame.refund(), output, frame.take_logs());
                }
                Ok(StepOutcome::Revert) => {
                    return ExecutionResult::revert(frame.gas_used(), frame.take_output());
                }
                Ok(StepOutcome::Aborted) => return ExecutionResult::aborted(frame.gas_used()),
                Err(e) => {
                    tracing::debug!("Frame fault at pc={}: {}", frame.pc(), e);
                    return ExecutionResult::fault(e, frame.message().gas);
                }
            }
        }
    }
}

impl<H: StepHook> Host for Evm<'_, H> {
    fn state(&self) -> &WorldState {
        &*self.state
    }

    fn state_mut(&mut self) -> &mut WorldState {
        &mut *self.state
    }

    fn block(&self) -> &BlockEnv {
        &self.block
    }

    fn tx(&self) -> &TxEnv {
        &self.tx
    }

    fn call(&mut self, message: Message) -> ExecutionResult {
        self.execute(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecStatus;
    use evmsim_primitives::{Address, H256, U256};

    fn caller() -> Address {
        Address::from_low_u64(0xCA11)
    }

    fn contract() -> Address {
        Address::from_low_u64(0xC0DE)
    }

    fn run_code(state: &mut WorldState, code: Vec<u8>, gas: u64) -> ExecutionResult {
        state.set_code(contract(), code);
        let mut evm = Evm::new(state, BlockEnv::default(), TxEnv::default());
        evm.execute(Message::call(caller(), contract(), 0, vec![], gas))
    }

    #[test]
    fn test_add_and_return() {
        let mut state = WorldState::new();
        // PUSH1 2 PUSH1 3 ADD PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let code = vec![0x60, 2, 0x60, 3, 0x01, 0x60, 0, 0x52, 0x60, 32, 0x60, 0, 0xF3];
        let result = run_code(&mut state, code, 100_000);
        assert!(result.is_success());
        assert_eq!(U256::from_big_endian(&result.output), U256::from(5));
    }

    #[test]
    fn test_revert_rolls_back_storage() {
        let mut state = WorldState::new();
        // PUSH1 1 PUSH1 0 SSTORE PUSH1 0 PUSH1 0 REVERT
        let code = vec![0x60, 1, 0x60, 0, 0x55, 0x60, 0, 0x60, 0, 0xFD];
        let result = run_code(&mut state, code, 100_000);
        assert_eq!(result.status, ExecStatus::Revert);
        assert_eq!(state.storage(&contract(), &H256::ZERO), H256::ZERO);
    }

    #[test]
    fn test_fault_consumes_all_gas() {
        let mut state = WorldState::new();
        let result = run_code(&mut state, vec![0x01], 50_000);
        assert_eq!(result.error(), Some(&EvmError::StackUnderflow));
        assert_eq!(result.gas_used, 50_000);
    }

    #[test]
    fn test_create_collision() {
        let mut state = WorldState::new();
        state.set_code(contract(), vec![0x00]);
        let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default());
        let result = evm.execute(Message::create(caller(), contract(), 0, vec![0x00], 100_000));
        assert_eq!(result.error(), Some(&EvmError::CreateCollision));
    }

    #[test]
    fn test_value_transfer_without_funds() {
        let mut state = WorldState::new();
        let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default());
        let result = evm.execute(Message::call(caller(), contract(), 1, vec![], 100_000));
        assert_eq!(result.error(), Some(&EvmError::InsufficientBalance));
    }

    #[derive(Default)]
    struct Counter {
        frames: usize,
        steps: usize,
        resumed: usize,
        abort_after: Option<usize>,
        refuse_at: Option<usize>,
        aborted: usize,
        writes: usize,
    }

    impl StepHook for Counter {
        fn frame_started(&mut self, _frame: &Interpreter, _state: &WorldState) {
            self.frames += 1;
        }

        fn frame_resumed(&mut self, _frame: &Interpreter, _state: &WorldState) {
            self.resumed += 1;
        }

        fn before_step(&mut self, _frame: &Interpreter, _state: &WorldState) -> bool {
            self.steps += 1;
            !self.refuse_at.is_some_and(|n| self.steps >= n)
        }

        fn storage_written(&mut self, _address: Address, _slot: U256, _value: U256) {
            self.writes += 1;
        }

        fn is_aborted(&self) -> bool {
            self.abort_after.is_some_and(|n| self.steps >= n)
        }

        fn aborted(&mut self) {
            self.aborted += 1;
        }
    }

    #[test]
    fn test_hook_sees_every_step() {
        let mut state = WorldState::new();
        state.set_code(contract(), vec![0x60, 1, 0x60, 2, 0x01, 0x00]);
        let mut hook = Counter::default();
        let mut evm = Evm::with_hook(&mut state, BlockEnv::default(), TxEnv::default(), &mut hook);
        assert!(evm.execute(Message::call(caller(), contract(), 0, vec![], 100_000)).is_success());
        assert_eq!(hook.frames, 1);
        assert_eq!(hook.steps, 4);
        assert_eq!(hook.aborted, 0);
    }

    #[test]
    fn test_abort_stops_before_next_step() {
        let mut state = WorldState::new();
        state.set_code(contract(), vec![0x60, 1, 0x60, 0, 0x55, 0x00]);
        let mut hook = Counter {
            abort_after: Some(2),
            ..Default::default()
        };
        let mut evm = Evm::with_hook(&mut state, BlockEnv::default(), TxEnv::default(), &mut hook);
        let result = evm.execute(Message::call(caller(), contract(), 0, vec![], 100_000));
        assert!(result.is_aborted());
        assert_eq!(hook.steps, 2);
        assert_eq!(hook.aborted, 1);
    }

    /// Test that an abort raised during a granted step lets that step finish
    #[test]
    fn test_abort_after_grant_completes_step() {
        let mut state = WorldState::new();
        state.set_code(contract(), vec![0x60, 1, 0x60, 0, 0x55, 0x00]);
        let mut hook = Counter {
            abort_after: Some(3),
            ..Default::default()
        };
        let mut evm = Evm::with_hook(&mut state, BlockEnv::default(), TxEnv::default(), &mut hook);
        let result = evm.execute(Message::call(caller(), contract(), 0, vec![], 100_000));
        assert!(result.is_aborted());
        assert_eq!(hook.steps, 3);
        // the SSTORE granted third still ran
        assert_eq!(hook.writes, 1);
        assert_eq!(hook.aborted, 1);
    }

    /// Test that a refused step never executes
    #[test]
    fn test_refused_step_aborts() {
        let mut state = WorldState::new();
        state.set_code(contract(), vec![0x60, 1, 0x60, 0, 0x55, 0x00]);
        let mut hook = Counter {
            refuse_at: Some(3),
            ..Default::default()
        };
        let mut evm = Evm::with_hook(&mut state, BlockEnv::default(), TxEnv::default(), &mut hook);
        let result = evm.execute(Message::call(caller(), contract(), 0, vec![], 100_000));
        assert!(result.is_aborted());
        assert_eq!(hook.steps, 3);
        assert_eq!(hook.aborted, 1);
        assert_eq!(hook.writes, 0);
    }
}
