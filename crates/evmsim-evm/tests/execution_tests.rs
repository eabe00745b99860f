//! Message execution tests for evmsim-evm
//!
//! Tests nested frames, creation, rollback and the step hook across frames.

use evmsim_evm::{
    create2_address, create_address, deployer, Assembler, BlockEnv, Evm, ExecStatus, ExecutionResult,
    Interpreter, Message, Opcode, StepHook, TxEnv,
};
use evmsim_primitives::{Address, H256, U256};
use evmsim_state::{StateReader, StateWriter, WorldState};

fn sender() -> Address {
    Address::from_low_u64(0x5E4D)
}

fn contract_a() -> Address {
    Address::from_low_u64(0xAAAA)
}

fn contract_b() -> Address {
    Address::from_low_u64(0xBBBB)
}

fn call(state: &mut WorldState, to: Address, value: u128) -> ExecutionResult {
    let mut evm = Evm::new(state, BlockEnv::default(), TxEnv { origin: sender(), gas_price: 1 });
    evm.execute(Message::call(sender(), to, value, vec![], 1_000_000))
}

fn slot(state: &WorldState, address: Address, key: u64) -> U256 {
    state.storage(&address, &H256::from_word(U256::from(key))).to_word()
}

/// CALL with empty input and a 32-byte output window at memory 0
fn call_into(asm: Assembler, opcode: Opcode, to: Address) -> Assembler {
    let asm = asm.push(32u64).push(0u64).push(0u64).push(0u64);
    let asm = if matches!(opcode, Opcode::CALL | Opcode::CALLCODE) {
        asm.push(0u64)
    } else {
        asm
    };
    asm.push_bytes(to.as_bytes()).op(Opcode::GAS).op(opcode)
}

/// Store 42 at slot 0 and return the word 7
fn storing_callee() -> Vec<u8> {
    Assembler::new()
        .push(42u64)
        .push(0u64)
        .op(Opcode::SSTORE)
        .push(7u64)
        .push(0u64)
        .op(Opcode::MSTORE)
        .push(32u64)
        .push(0u64)
        .op(Opcode::RETURN)
        .build()
        .unwrap()
}

// ==================== Nested Call Tests ====================

/// Test a CALL whose output is copied back and returned
#[test]
fn test_nested_call_returns_output() {
    let mut state = WorldState::new();
    state.set_code(contract_b(), storing_callee());
    let caller = call_into(Assembler::new(), Opcode::CALL, contract_b())
        .push(1u64)
        .op(Opcode::SSTORE)
        .push(32u64)
        .push(0u64)
        .op(Opcode::RETURN)
        .build()
        .unwrap();
    state.set_code(contract_a(), caller);

    let result = call(&mut state, contract_a(), 0);
    assert!(result.is_success());
    assert_eq!(U256::from_big_endian(&result.output), U256::from(7));
    assert_eq!(slot(&state, contract_b(), 0), U256::from(42));
    assert_eq!(slot(&state, contract_a(), 1), U256::one());
}

/// Test that a reverting child leaves the parent's writes intact
#[test]
fn test_child_revert_is_frame_local() {
    let mut state = WorldState::new();
    let callee = Assembler::new()
        .push(9u64)
        .push(0u64)
        .op(Opcode::SSTORE)
        .push(0u64)
        .push(0u64)
        .op(Opcode::REVERT)
        .build()
        .unwrap();
    state.set_code(contract_b(), callee);
    let caller = Assembler::new()
        .push(1u64)
        .push(1u64)
        .op(Opcode::SSTORE);
    let caller = call_into(caller, Opcode::CALL, contract_b())
        .op(Opcode::ISZERO)
        .push(2u64)
        .op(Opcode::SSTORE)
        .op(Opcode::STOP)
        .build()
        .unwrap();
    state.set_code(contract_a(), caller);

    let result = call(&mut state, contract_a(), 0);
    assert!(result.is_success());
    assert_eq!(slot(&state, contract_a(), 1), U256::one());
    assert_eq!(slot(&state, contract_a(), 2), U256::one());
    assert_eq!(slot(&state, contract_b(), 0), U256::zero());
}

/// Test that a top-level revert discards everything
#[test]
fn test_top_level_revert_discards_value_transfer() {
    let mut state = WorldState::new();
    state.set_balance(sender(), 10);
    state.set_code(
        contract_a(),
        Assembler::new().push(0u64).push(0u64).op(Opcode::REVERT).build().unwrap(),
    );
    let result = call(&mut state, contract_a(), 4);
    assert_eq!(result.status, ExecStatus::Revert);
    assert_eq!(state.balance(&sender()), 10);
    assert_eq!(state.balance(&contract_a()), 0);
}

/// Test that DELEGATECALL writes into the caller's storage
#[test]
fn test_delegatecall_uses_caller_storage() {
    let mut state = WorldState::new();
    state.set_code(contract_b(), storing_callee());
    let caller = call_into(Assembler::new(), Opcode::DELEGATECALL, contract_b())
        .op(Opcode::POP)
        .op(Opcode::STOP)
        .build()
        .unwrap();
    state.set_code(contract_a(), caller);

    assert!(call(&mut state, contract_a(), 0).is_success());
    assert_eq!(slot(&state, contract_a(), 0), U256::from(42));
    assert_eq!(slot(&state, contract_b(), 0), U256::zero());
}

/// Test that SSTORE inside STATICCALL fails the child only
#[test]
fn test_staticcall_rejects_sstore() {
    let mut state = WorldState::new();
    state.set_code(contract_b(), storing_callee());
    let caller = call_into(Assembler::new(), Opcode::STATICCALL, contract_b())
        .push(0u64)
        .op(Opcode::SSTORE)
        .op(Opcode::STOP)
        .build()
        .unwrap();
    state.set_code(contract_a(), caller);
    state.set_storage(contract_a(), H256::ZERO, H256::from_word(U256::from(5)));

    assert!(call(&mut state, contract_a(), 0).is_success());
    assert_eq!(slot(&state, contract_a(), 0), U256::zero());
    assert_eq!(slot(&state, contract_b(), 0), U256::zero());
}

/// Test calling the identity precompile
#[test]
fn test_identity_precompile() {
    let mut state = WorldState::new();
    let caller = Assembler::new()
        .push(0xABCDu64)
        .push(0u64)
        .op(Opcode::MSTORE)
        // out 32 at 32, in 32 at 0
        .push(32u64)
        .push(32u64)
        .push(32u64)
        .push(0u64)
        .push(0u64)
        .push(4u64)
        .op(Opcode::GAS)
        .op(Opcode::CALL)
        .op(Opcode::POP)
        .push(32u64)
        .push(32u64)
        .op(Opcode::RETURN)
        .build()
        .unwrap();
    state.set_code(contract_a(), caller);

    let result = call(&mut state, contract_a(), 0);
    assert!(result.is_success());
    assert_eq!(U256::from_big_endian(&result.output), U256::from(0xABCD));
}

// ==================== Creation Tests ====================

/// Test a creation message installing runtime code
#[test]
fn test_create_message_deploys_runtime() {
    let mut state = WorldState::new();
    let runtime = storing_callee();
    let init = deployer(&[], &runtime).unwrap();
    let target = create_address(&sender(), 0);

    let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default());
    let result = evm.execute(Message::create(sender(), target, 0, init, 1_000_000));
    assert!(result.is_success());
    assert_eq!(result.created_address, Some(target));
    assert!(result.output.is_empty());
    assert!(result.gas_used >= runtime.len() as u64 * 200);
    assert_eq!(state.code(&target), runtime);
    assert_eq!(state.nonce(&target), 1);
}

/// Test CREATE from a contract
#[test]
fn test_create_opcode() {
    let mut state = WorldState::new();
    let init = deployer(&[], &[0x00]).unwrap();
    assert_eq!(init.len(), 16);
    let creator = Assembler::new()
        .push_bytes(&init)
        .push(0u64)
        .op(Opcode::MSTORE)
        .push(16u64)
        .push(16u64)
        .push(0u64)
        .op(Opcode::CREATE)
        .push(0u64)
        .op(Opcode::SSTORE)
        .op(Opcode::STOP)
        .build()
        .unwrap();
    state.set_code(contract_a(), creator);

    assert!(call(&mut state, contract_a(), 0).is_success());
    let child = create_address(&contract_a(), 0);
    assert_eq!(slot(&state, contract_a(), 0), child.to_word());
    assert_eq!(state.code(&child), vec![0x00]);
    assert_eq!(state.nonce(&contract_a()), 1);
}

/// Test CREATE2 address derivation
#[test]
fn test_create2_opcode() {
    let mut state = WorldState::new();
    let init = deployer(&[], &[0x00]).unwrap();
    let creator = Assembler::new()
        .push_bytes(&init)
        .push(0u64)
        .op(Opcode::MSTORE)
        .push(0x5A17u64)
        .push(16u64)
        .push(16u64)
        .push(0u64)
        .op(Opcode::CREATE2)
        .push(0u64)
        .op(Opcode::SSTORE)
        .op(Opcode::STOP)
        .build()
        .unwrap();
    state.set_code(contract_a(), creator);

    assert!(call(&mut state, contract_a(), 0).is_success());
    let child = create2_address(&contract_a(), U256::from(0x5A17), &init);
    assert_eq!(slot(&state, contract_a(), 0), child.to_word());
    assert_eq!(state.code(&child), vec![0x00]);
}

/// Test that an oversized runtime fails the creation
#[test]
fn test_create_rejects_oversized_code() {
    let mut state = WorldState::new();
    // RETURN 24577 bytes of zeroed memory
    let init = Assembler::new()
        .push(24_577u64)
        .push(0u64)
        .op(Opcode::RETURN)
        .build()
        .unwrap();
    let target = create_address(&sender(), 0);
    let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default());
    let result = evm.execute(Message::create(sender(), target, 0, init, 10_000_000));
    assert!(matches!(result.status, ExecStatus::Fault(_)));
    assert!(state.code(&target).is_empty());
    assert!(!state.exists(&target));
}

// ==================== Selfdestruct and Log Tests ====================

/// Test that SELFDESTRUCT moves the balance and clears the account at tx end
#[test]
fn test_selfdestruct_to_beneficiary() {
    let mut state = WorldState::new();
    let beneficiary = Address::from_low_u64(1);
    let code = Assembler::new()
        .push_bytes(beneficiary.as_bytes())
        .op(Opcode::SELFDESTRUCT)
        .build()
        .unwrap();
    state.set_code(contract_a(), code);
    state.set_balance(contract_a(), 1);

    assert!(call(&mut state, contract_a(), 0).is_success());
    let destroyed = state.finalize_tx();
    assert_eq!(destroyed, vec![contract_a()]);
    assert_eq!(state.balance(&beneficiary), 1);
    assert_eq!(state.balance(&contract_a()), 0);
    assert!(state.code(&contract_a()).is_empty());
}

/// Test LOG2 topics and data
#[test]
fn test_log_emission() {
    let mut state = WorldState::new();
    let code = Assembler::new()
        .push(0xFFu64)
        .push(0u64)
        .op(Opcode::MSTORE8)
        .push(0x22u64)
        .push(0x11u64)
        .push(1u64)
        .push(0u64)
        .op(Opcode::LOG2)
        .op(Opcode::STOP)
        .build()
        .unwrap();
    state.set_code(contract_a(), code);

    let result = call(&mut state, contract_a(), 0);
    assert_eq!(result.logs.len(), 1);
    let log = &result.logs[0];
    assert_eq!(log.address, contract_a());
    assert_eq!(
        log.topics,
        vec![H256::from_word(U256::from(0x11)), H256::from_word(U256::from(0x22))]
    );
    assert_eq!(log.data.as_ref(), &[0xFF]);
}

// ==================== Step Hook Tests ====================

#[derive(Default)]
struct Trace {
    frames: Vec<(usize, Address)>,
    resumed: Vec<usize>,
    pcs: Vec<(usize, usize)>,
    stores: Vec<(Address, U256, U256)>,
    costs: Vec<u64>,
}

impl StepHook for Trace {
    fn frame_started(&mut self, frame: &Interpreter, _state: &WorldState) {
        self.frames.push((frame.message().depth, frame.message().target));
    }

    fn frame_resumed(&mut self, frame: &Interpreter, _state: &WorldState) {
        self.resumed.push(frame.message().depth);
    }

    fn before_step(&mut self, frame: &Interpreter, _state: &WorldState) -> bool {
        self.pcs.push((frame.message().depth, frame.pc()));
        true
    }

    fn storage_written(&mut self, address: Address, slot: U256, value: U256) {
        self.stores.push((address, slot, value));
    }

    fn after_step(&mut self, frame: &Interpreter, _state: &WorldState) {
        self.costs.push(frame.last_gas_cost());
    }
}

/// Test that the hook follows execution into and out of a child frame
#[test]
fn test_hook_across_frames() {
    let mut state = WorldState::new();
    state.set_code(contract_b(), storing_callee());
    let caller = call_into(Assembler::new(), Opcode::CALL, contract_b())
        .op(Opcode::STOP)
        .build()
        .unwrap();
    state.set_code(contract_a(), caller);

    let mut trace = Trace::default();
    let mut evm = Evm::with_hook(&mut state, BlockEnv::default(), TxEnv::default(), &mut trace);
    assert!(evm
        .execute(Message::call(sender(), contract_a(), 0, vec![], 1_000_000))
        .is_success());

    assert_eq!(trace.frames, vec![(0, contract_a()), (1, contract_b())]);
    assert_eq!(trace.resumed, vec![0]);
    assert_eq!(trace.stores, vec![(contract_b(), U256::zero(), U256::from(42))]);
    // every step that started also finished
    assert_eq!(trace.pcs.len(), trace.costs.len());
    assert!(trace.pcs.contains(&(1, 0)));
    // SSTORE of a fresh slot costs 20000
    assert!(trace.costs.contains(&20_000));
}
