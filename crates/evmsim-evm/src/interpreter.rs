//! Single-frame bytecode interpreter

use crate::arith;
use crate::context::{BlockEnv, CallKind, Message, TxEnv};
use crate::error::{EvmError, EvmResult, ExecStatus, ExecutionResult};
use crate::gas::{self, cost};
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::stack::Stack;
use bytes::Bytes;
use evmsim_crypto::keccak256;
use evmsim_primitives::{Address, H256, U256};
use evmsim_state::{StateReader, StateWriter, WorldState};
use evmsim_types::Log;

/// Offsets and sizes above this cost more gas than any block holds
const MAX_MEMORY_OFFSET: u64 = u32::MAX as u64;

/// Services a frame needs from the outside world
pub trait Host {
    /// World state
    fn state(&self) -> &WorldState;

    /// Mutable world state
    fn state_mut(&mut self) -> &mut WorldState;

    /// Block environment
    fn block(&self) -> &BlockEnv;

    /// Transaction environment
    fn tx(&self) -> &TxEnv;

    /// Run a child frame to completion
    fn call(&mut self, message: Message) -> ExecutionResult;
}

/// What the executor should do after a step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Fetch the next opcode
    Continue,
    /// STOP, RETURN or SELFDESTRUCT
    Halt,
    /// REVERT
    Revert,
    /// A child frame was aborted
    Aborted,
}

/// Execution state of one frame
#[derive(Clone, Debug)]
pub struct Interpreter {
    message: Message,
    code: Vec<u8>,
    pc: usize,
    stack: Stack,
    memory: Memory,
    gas_remaining: u64,
    gas_at_step: u64,
    last_gas_cost: u64,
    refund: u64,
    return_data: Vec<u8>,
    output: Vec<u8>,
    jump_dests: Vec<bool>,
    logs: Vec<Log>,
}

impl Interpreter {
    /// Frame running `code` for `message`
    pub fn new(message: Message, code: Vec<u8>) -> Self {
        let jump_dests = analyze_jump_dests(&code);
        let gas = message.gas;
        Self {
            message,
            code,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            gas_remaining: gas,
            gas_at_step: gas,
            last_gas_cost: 0,
            refund: 0,
            return_data: Vec::new(),
            output: Vec::new(),
            jump_dests,
            logs: Vec::new(),
        }
    }

    /// Input message
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Bytecode
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Program counter
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Byte at the program counter, `None` past the end
    pub fn current_opcode(&self) -> Option<u8> {
        self.code.get(self.pc).copied()
    }

    /// Whether the program counter ran off the code
    pub fn is_finished(&self) -> bool {
        self.pc >= self.code.len()
    }

    /// Stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Gas left
    pub fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    /// Gas used so far
    pub fn gas_used(&self) -> u64 {
        self.message.gas - self.gas_remaining
    }

    /// Net gas consumed by the most recent step
    pub fn last_gas_cost(&self) -> u64 {
        self.last_gas_cost
    }

    /// Accumulated refund
    pub fn refund(&self) -> u64 {
        self.refund
    }

    /// Data returned by the most recent child frame
    pub fn return_data(&self) -> &[u8] {
        &self.return_data
    }

    /// Take RETURN or REVERT data
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Take emitted logs
    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    /// Slot and value an SSTORE at the program counter will write
    pub fn sstore_preimage(&self) -> Option<(U256, U256)> {
        if self.current_opcode() != Some(Opcode::SSTORE as u8) {
            return None;
        }
        let slot = self.stack.peek(0).ok()?.as_u256();
        let value = self.stack.peek(1).ok()?.as_u256();
        Some((slot, value))
    }

    /// Execute the opcode at the program counter
    pub fn step(&mut self, host: &mut dyn Host) -> EvmResult<StepOutcome> {
        self.gas_at_step = self.gas_remaining;
        let outcome = self.execute(host);
        self.last_gas_cost = self.gas_at_step.saturating_sub(self.gas_remaining);
        outcome
    }

    fn use_gas(&mut self, amount: u64) -> EvmResult<()> {
        if self.gas_remaining < amount {
            self.gas_remaining = 0;
            return Err(EvmError::OutOfGas);
        }
        self.gas_remaining -= amount;
        Ok(())
    }

    fn require_mutable(&self) -> EvmResult<()> {
        if self.message.is_static {
            return Err(EvmError::StaticCallViolation);
        }
        Ok(())
    }

    /// Charge for and grow memory covering `[offset, offset + size)`
    fn touch_memory(&mut self, offset: U256, size: U256) -> EvmResult<(usize, usize)> {
        if size.is_zero() {
            return Ok((0, 0));
        }
        let offset = memory_index(offset)?;
        let size = memory_index(size)?;
        let new_size = self.memory.required_size(offset, size);
        self.use_gas(gas::memory_expansion_cost(self.memory.size(), new_size))?;
        self.memory.resize(new_size);
        Ok((offset, size))
    }

    fn jump(&mut self, dest: U256) -> EvmResult<()> {
        let target = usize::try_from(dest).unwrap_or(usize::MAX);
        if !self.jump_dests.get(target).copied().unwrap_or(false) {
            return Err(EvmError::InvalidJump(target));
        }
        self.pc = target;
        Ok(())
    }

    fn binary(&mut self, f: impl FnOnce(U256, U256) -> U256) -> EvmResult<()> {
        let [a, b] = self.stack.pop_n()?;
        self.stack.push(f(a, b))
    }

    fn compare(&mut self, f: impl FnOnce(&U256, &U256) -> bool) -> EvmResult<()> {
        let [a, b] = self.stack.pop_n()?;
        self.stack.push_bool(f(&a, &b))
    }

    fn copy_to_memory(&mut self, source: &[u8], dest: U256, offset: U256, size: U256) -> EvmResult<()> {
        let (dest, size) = self.touch_memory(dest, size)?;
        self.use_gas(gas::copy_gas(size))?;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        self.memory.copy_from(dest, source, offset, size);
        Ok(())
    }

    fn execute(&mut self, host: &mut dyn Host) -> EvmResult<StepOutcome> {
        let Some(byte) = self.current_opcode() else {
            return Ok(StepOutcome::Halt);
        };
        let opcode = Opcode::from_byte(byte).ok_or(EvmError::InvalidOpcode(byte))?;
        self.use_gas(gas::static_gas(opcode))?;
        let pc = self.pc;
        self.pc += 1;

        match opcode {
            Opcode::STOP => return Ok(StepOutcome::Halt),

            // Arithmetic
            Opcode::ADD => self.binary(|a, b| a.overflowing_add(b).0)?,
            Opcode::MUL => self.binary(|a, b| a.overflowing_mul(b).0)?,
            Opcode::SUB => self.binary(|a, b| a.overflowing_sub(b).0)?,
            Opcode::DIV => self.binary(|a, b| if b.is_zero() { U256::zero() } else { a / b })?,
            Opcode::SDIV => self.binary(arith::sdiv)?,
            Opcode::MOD => self.binary(|a, b| if b.is_zero() { U256::zero() } else { a % b })?,
            Opcode::SMOD => self.binary(arith::smod)?,
            Opcode::ADDMOD => {
                let [a, b, n] = self.stack.pop_n()?;
                self.stack.push(arith::addmod(a, b, n))?;
            }
            Opcode::MULMOD => {
                let [a, b, n] = self.stack.pop_n()?;
                self.stack.push(arith::mulmod(a, b, n))?;
            }
            Opcode::EXP => {
                let [base, exponent] = self.stack.pop_n()?;
                self.use_gas(gas::exp_gas(&exponent))?;
                self.stack.push(arith::exp(base, exponent))?;
            }
            Opcode::SIGNEXTEND => self.binary(arith::signextend)?,

            // Comparison and bitwise
            Opcode::LT => self.compare(|a, b| a < b)?,
            Opcode::GT => self.compare(|a, b| a > b)?,
            Opcode::SLT => self.compare(arith::slt)?,
            Opcode::SGT => self.compare(arith::sgt)?,
            Opcode::EQ => self.compare(|a, b| a == b)?,
            Opcode::ISZERO => {
                let a = self.stack.pop_u256()?;
                self.stack.push_bool(a.is_zero())?;
            }
            Opcode::AND => self.binary(|a, b| a & b)?,
            Opcode::OR => self.binary(|a, b| a | b)?,
            Opcode::XOR => self.binary(|a, b| a ^ b)?,
            Opcode::NOT => {
                let a = self.stack.pop_u256()?;
                self.stack.push(!a)?;
            }
            Opcode::BYTE => self.binary(arith::byte)?,
            Opcode::SHL => self.binary(arith::shl)?,
            Opcode::SHR => self.binary(arith::shr)?,
            Opcode::SAR => self.binary(arith::sar)?,

            Opcode::SHA3 => {
                let [offset, size] = self.stack.pop_n()?;
                let (offset, size) = self.touch_memory(offset, size)?;
                self.use_gas(gas::sha3_gas(size))?;
                let hash = keccak256(&self.memory.load_slice(offset, size));
                self.stack.push_bytes(hash.as_bytes().to_vec())?;
            }

            // Environment
            Opcode::ADDRESS => self.stack.push(self.message.target)?,
            Opcode::BALANCE => {
                let address = self.stack.pop()?.as_address();
                self.stack.push(U256::from(host.state().balance(&address)))?;
            }
            Opcode::ORIGIN => self.stack.push(host.tx().origin)?,
            Opcode::CALLER => self.stack.push(self.message.caller)?,
            Opcode::CALLVALUE => self.stack.push(U256::from(self.message.value))?,
            Opcode::CALLDATALOAD => {
                let offset = usize::try_from(self.stack.pop_u256()?).unwrap_or(usize::MAX);
                let mut word = Memory::new();
                word.copy_from(0, &self.message.data, offset, 32);
                self.stack.push(word.load_word(0))?;
            }
            Opcode::CALLDATASIZE => self.stack.push(U256::from(self.message.data.len()))?,
            Opcode::CALLDATACOPY => {
                let [dest, offset, size] = self.stack.pop_n()?;
                let data = std::mem::take(&mut self.message.data);
                let copied = self.copy_to_memory(&data, dest, offset, size);
                self.message.data = data;
                copied?;
            }
            Opcode::CODESIZE => self.stack.push(U256::from(self.code.len()))?,
            Opcode::CODECOPY => {
                let [dest, offset, size] = self.stack.pop_n()?;
                let code = std::mem::take(&mut self.code);
                let copied = self.copy_to_memory(&code, dest, offset, size);
                self.code = code;
                copied?;
            }
            Opcode::GASPRICE => self.stack.push(U256::from(host.tx().gas_price))?,
            Opcode::EXTCODESIZE => {
                let address = self.stack.pop()?.as_address();
                self.stack.push(U256::from(host.state().code(&address).len()))?;
            }
            Opcode::EXTCODECOPY => {
                let address = self.stack.pop()?.as_address();
                let [dest, offset, size] = self.stack.pop_n()?;
                let code = host.state().code(&address);
                self.copy_to_memory(&code, dest, offset, size)?;
            }
            Opcode::RETURNDATASIZE => self.stack.push(U256::from(self.return_data.len()))?,
            Opcode::RETURNDATACOPY => {
                let [dest, offset, size] = self.stack.pop_n()?;
                let end = offset.checked_add(size).ok_or(EvmError::ReturnDataOutOfBounds)?;
                if end > U256::from(self.return_data.len()) {
                    return Err(EvmError::ReturnDataOutOfBounds);
                }
                let data = std::mem::take(&mut self.return_data);
                let copied = self.copy_to_memory(&data, dest, offset, size);
                self.return_data = data;
                copied?;
            }
            Opcode::EXTCODEHASH => {
                let address = self.stack.pop()?.as_address();
                let state = host.state();
                if state.exists(&address) {
                    self.stack.push_bytes(state.code_hash(&address).as_bytes().to_vec())?;
                } else {
                    self.stack.push(U256::zero())?;
                }
            }

            // Block
            Opcode::BLOCKHASH => {
                let number = self.stack.pop_u256()?;
                let hash = if number > U256::from(u64::MAX) {
                    H256::ZERO
                } else {
                    host.block().block_hash(number.low_u64())
                };
                self.stack.push_bytes(hash.as_bytes().to_vec())?;
            }
            Opcode::COINBASE => self.stack.push(host.block().coinbase)?,
            Opcode::TIMESTAMP => self.stack.push(U256::from(host.block().timestamp))?,
            Opcode::NUMBER => self.stack.push(U256::from(host.block().number))?,
            Opcode::DIFFICULTY => self.stack.push(host.block().difficulty)?,
            Opcode::GASLIMIT => self.stack.push(U256::from(host.block().gas_limit))?,
            Opcode::CHAINID => self.stack.push(U256::from(host.block().chain_id))?,
            Opcode::SELFBALANCE => {
                let balance = host.state().balance(&self.message.target);
                self.stack.push(U256::from(balance))?;
            }

            // Stack, memory, storage and flow
            Opcode::POP => {
                self.stack.pop()?;
            }
            Opcode::MLOAD => {
                let offset = self.stack.pop_u256()?;
                let (offset, _) = self.touch_memory(offset, U256::from(32))?;
                self.stack.push(self.memory.load_word(offset))?;
            }
            Opcode::MSTORE => {
                let [offset, value] = self.stack.pop_n()?;
                let (offset, _) = self.touch_memory(offset, U256::from(32))?;
                self.memory.store_word(offset, &value);
            }
            Opcode::MSTORE8 => {
                let [offset, value] = self.stack.pop_n()?;
                let (offset, _) = self.touch_memory(offset, U256::one())?;
                self.memory.store_byte(offset, value.low_u64() as u8);
            }
            Opcode::SLOAD => {
                let slot = self.stack.pop_u256()?;
                let value = host
                    .state()
                    .storage(&self.message.target, &H256::from_word(slot));
                self.stack.push(value.to_word())?;
            }
            Opcode::SSTORE => {
                self.require_mutable()?;
                let [slot, value] = self.stack.pop_n()?;
                let key = H256::from_word(slot);
                let current = host.state().storage(&self.message.target, &key).to_word();
                let (charge, refund) = gas::sstore_gas(&current, &value);
                self.use_gas(charge)?;
                self.refund += refund;
                host.state_mut()
                    .set_storage(self.message.target, key, H256::from_word(value));
            }
            Opcode::JUMP => {
                let dest = self.stack.pop_u256()?;
                self.jump(dest)?;
            }
            Opcode::JUMPI => {
                let [dest, condition] = self.stack.pop_n()?;
                if !condition.is_zero() {
                    self.jump(dest)?;
                }
            }
            Opcode::PC => self.stack.push(U256::from(pc))?,
            Opcode::MSIZE => self.stack.push(U256::from(self.memory.size()))?,
            Opcode::GAS => self.stack.push(U256::from(self.gas_remaining))?,
            Opcode::JUMPDEST => {}

            // Logging
            Opcode::LOG0 | Opcode::LOG1 | Opcode::LOG2 | Opcode::LOG3 | Opcode::LOG4 => {
                self.require_mutable()?;
                let topic_count = opcode.log_topics().unwrap_or(0);
                let [offset, size] = self.stack.pop_n()?;
                let mut topics = Vec::with_capacity(topic_count);
                for _ in 0..topic_count {
                    topics.push(H256::from_word(self.stack.pop_u256()?));
                }
                let (offset, size) = self.touch_memory(offset, size)?;
                self.use_gas(gas::log_gas(topic_count, size))?;
                let data = Bytes::from(self.memory.load_slice(offset, size));
                self.logs.push(Log::new(self.message.target, topics, data));
            }

            // System
            Opcode::CREATE | Opcode::CREATE2 => return self.create(opcode, host),
            Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL | Opcode::STATICCALL => {
                return self.call(opcode, host)
            }
            Opcode::RETURN | Opcode::REVERT => {
                let [offset, size] = self.stack.pop_n()?;
                let (offset, size) = self.touch_memory(offset, size)?;
                self.output = self.memory.load_slice(offset, size);
                return Ok(if opcode == Opcode::RETURN {
                    StepOutcome::Halt
                } else {
                    StepOutcome::Revert
                });
            }
            Opcode::INVALID => return Err(EvmError::InvalidOpcode(byte)),
            Opcode::SELFDESTRUCT => {
                self.require_mutable()?;
                let beneficiary = self.stack.pop()?.as_address();
                let target = self.message.target;
                let balance = host.state().balance(&target);
                if balance > 0 && !host.state().exists(&beneficiary) {
                    self.use_gas(cost::SELFDESTRUCT_NEW_ACCOUNT)?;
                }
                let state = host.state_mut();
                if !state.is_destroyed(&target) {
                    self.refund += cost::SELFDESTRUCT_REFUND;
                }
                state.sub_balance(&target, balance)?;
                state.add_balance(&beneficiary, balance)?;
                state.mark_destroyed(target);
                return Ok(StepOutcome::Halt);
            }

            _ => {
                let push = opcode.push_size();
                let dup = opcode.dup_depth();
                let swap = opcode.swap_depth();
                if push > 0 {
                    let mut immediate = vec![0u8; push];
                    let start = self.pc.min(self.code.len());
                    let end = (self.pc + push).min(self.code.len());
                    immediate[..end - start].copy_from_slice(&self.code[start..end]);
                    self.stack.push_bytes(immediate)?;
                    self.pc += push;
                } else if dup > 0 {
                    self.stack.dup(dup)?;
                } else if swap > 0 {
                    self.stack.swap(swap)?;
                } else {
                    return Err(EvmError::InvalidOpcode(byte));
                }
            }
        }

        Ok(StepOutcome::Continue)
    }

    fn create(&mut self, opcode: Opcode, host: &mut dyn Host) -> EvmResult<StepOutcome> {
        self.require_mutable()?;
        let [value, offset, size] = self.stack.pop_n()?;
        let salt = if opcode == Opcode::CREATE2 {
            Some(self.stack.pop_u256()?)
        } else {
            None
        };
        let (offset, size) = self.touch_memory(offset, size)?;
        if salt.is_some() {
            self.use_gas(gas::sha3_gas(size))?;
        }
        let init_code = self.memory.load_slice(offset, size);
        self.return_data.clear();

        let creator = self.message.target;
        let value = u128::try_from(value).unwrap_or(u128::MAX);
        if self.message.depth + 1 > cost::MAX_CALL_DEPTH || host.state().balance(&creator) < value {
            self.stack.push(U256::zero())?;
            return Ok(StepOutcome::Continue);
        }

        let nonce = host.state().nonce(&creator);
        let (kind, address) = match salt {
            Some(salt) => (CallKind::Create2 { salt }, create2_address(&creator, salt, &init_code)),
            None => (CallKind::Create, create_address(&creator, nonce)),
        };
        host.state_mut().increment_nonce(&creator)?;

        let child_gas = gas::all_but_one_64th(self.gas_remaining);
        self.use_gas(child_gas)?;
        let message = Message {
            kind,
            caller: creator,
            target: address,
            code_address: address,
            value,
            data: init_code,
            gas: child_gas,
            depth: self.message.depth + 1,
            is_static: false,
        };

        let result = host.call(message);
        self.gas_remaining += child_gas.saturating_sub(result.gas_used);
        match result.status {
            ExecStatus::Success => {
                self.refund += result.gas_refund;
                self.logs.extend(result.logs);
                self.stack.push(address)?;
            }
            ExecStatus::Revert => {
                self.return_data = result.output;
                self.stack.push(U256::zero())?;
            }
            ExecStatus::Fault(_) => self.stack.push(U256::zero())?,
            ExecStatus::Aborted => return Ok(StepOutcome::Aborted),
        }
        Ok(StepOutcome::Continue)
    }

    fn call(&mut self, opcode: Opcode, host: &mut dyn Host) -> EvmResult<StepOutcome> {
        let gas_requested = self.stack.pop_u256()?;
        let to = self.stack.pop()?.as_address();
        let value = if matches!(opcode, Opcode::CALL | Opcode::CALLCODE) {
            self.stack.pop_u256()?
        } else {
            U256::zero()
        };
        let [in_offset, in_size, out_offset, out_size] = self.stack.pop_n()?;

        if opcode == Opcode::CALL && self.message.is_static && !value.is_zero() {
            return Err(EvmError::StaticCallViolation);
        }

        let (in_offset, in_size) = self.touch_memory(in_offset, in_size)?;
        let (out_offset, out_size) = self.touch_memory(out_offset, out_size)?;

        let value = u128::try_from(value).unwrap_or(u128::MAX);
        if value > 0 {
            self.use_gas(cost::CALL_VALUE)?;
            if opcode == Opcode::CALL && !host.state().exists(&to) {
                self.use_gas(cost::CALL_NEW_ACCOUNT)?;
            }
        }

        let cap = gas::all_but_one_64th(self.gas_remaining);
        let forwarded = u64::try_from(gas_requested).unwrap_or(u64::MAX).min(cap);
        self.use_gas(forwarded)?;
        let child_gas = if value > 0 {
            forwarded + cost::CALL_STIPEND
        } else {
            forwarded
        };

        self.return_data.clear();
        let depth = self.message.depth + 1;
        if depth > cost::MAX_CALL_DEPTH || host.state().balance(&self.message.target) < value {
            self.gas_remaining += child_gas;
            self.stack.push(U256::zero())?;
            return Ok(StepOutcome::Continue);
        }

        let (kind, caller, target, value, is_static) = match opcode {
            Opcode::CALL => (CallKind::Call, self.message.target, to, value, self.message.is_static),
            Opcode::CALLCODE => (
                CallKind::CallCode,
                self.message.target,
                self.message.target,
                value,
                self.message.is_static,
            ),
            Opcode::DELEGATECALL => (
                CallKind::DelegateCall,
                self.message.caller,
                self.message.target,
                self.message.value,
                self.message.is_static,
            ),
            _ => (CallKind::StaticCall, self.message.target, to, 0, true),
        };
        let message = Message {
            kind,
            caller,
            target,
            code_address: to,
            value,
            data: self.memory.load_slice(in_offset, in_size),
            gas: child_gas,
            depth,
            is_static,
        };

        let result = host.call(message);
        self.gas_remaining += child_gas.saturating_sub(result.gas_used);
        if result.status == ExecStatus::Aborted {
            return Ok(StepOutcome::Aborted);
        }

        let copy = out_size.min(result.output.len());
        self.memory.store_slice(out_offset, &result.output[..copy]);
        let success = result.is_success();
        if success {
            self.refund += result.gas_refund;
            self.logs.extend(result.logs);
        }
        self.return_data = result.output;
        self.stack.push_bool(success)?;
        Ok(StepOutcome::Continue)
    }
}

fn memory_index(value: U256) -> EvmResult<usize> {
    if value > U256::from(MAX_MEMORY_OFFSET) {
        return Err(EvmError::OutOfGas);
    }
    Ok(value.low_u64() as usize)
}

/// Mark JUMPDEST bytes that are not inside PUSH data
fn analyze_jump_dests(code: &[u8]) -> Vec<bool> {
    let mut dests = vec![false; code.len()];
    let mut i = 0;
    while i < code.len() {
        let byte = code[i];
        if byte == Opcode::JUMPDEST as u8 {
            dests[i] = true;
        }
        i += 1 + crate::opcode::push_size(byte);
    }
    dests
}

/// CREATE address: keccak(rlp([sender, nonce]))[12..]
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = rlp::RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    let hash = keccak256(&stream.out());
    Address::from_word(hash.to_word())
}

/// CREATE2 address: keccak(0xff ++ sender ++ salt ++ keccak(init_code))[12..]
pub fn create2_address(sender: &Address, salt: U256, init_code: &[u8]) -> Address {
    let mut data = Vec::with_capacity(85);
    data.push(0xFF);
    data.extend_from_slice(sender.as_bytes());
    data.extend_from_slice(H256::from_word(salt).as_bytes());
    data.extend_from_slice(keccak256(init_code).as_bytes());
    Address::from_word(keccak256(&data).to_word())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_dests_skip_push_data() {
        // PUSH1 0x5b JUMPDEST
        let dests = analyze_jump_dests(&[0x60, 0x5B, 0x5B]);
        assert_eq!(dests, vec![false, false, true]);
    }

    #[test]
    fn test_create_address_known_vector() {
        // first contract deployed by 0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0
        let sender = Address::from_hex("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            create_address(&sender, 0),
            Address::from_hex("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap()
        );
        assert_eq!(
            create_address(&sender, 1),
            Address::from_hex("0x343c43a37d37dff08ae8c4a11544c718abb4fcf8").unwrap()
        );
    }

    #[test]
    fn test_create2_address_known_vector() {
        // EIP-1014 example 0
        let address = create2_address(&Address::ZERO, U256::zero(), &[0x00]);
        assert_eq!(
            address,
            Address::from_hex("0x4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38").unwrap()
        );
    }

    #[test]
    fn test_memory_index_limit() {
        assert_eq!(memory_index(U256::from(64)), Ok(64));
        assert_eq!(memory_index(U256::MAX), Err(EvmError::OutOfGas));
    }

    #[test]
    fn test_sstore_preimage() {
        let message = Message::call(Address::ZERO, Address::ZERO, 0, vec![], 100_000);
        let mut frame = Interpreter::new(message, vec![0x55]);
        assert_eq!(frame.sstore_preimage(), None);
        frame.stack.push(U256::from(7)).unwrap();
        frame.stack.push(U256::from(1)).unwrap();
        assert_eq!(frame.sstore_preimage(), Some((U256::from(1), U256::from(7))));
    }
}
