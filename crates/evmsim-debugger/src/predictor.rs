//! Effect predictor
//!
//! Derives, from the opcode about to execute and the stack as it is now,
//! the indices of every component the opcode reads and writes. Prediction
//! never fails: an unassigned byte yields an `INVALID` chain with no
//! effects.
//!
//! Links appear in a fixed order: the disassembly row, the stack, then
//! memory or storage, then accounts.

use crate::accessors::{word_range, StackView, WORD_SIZE};
use crate::changes::{ChangeChain, ChangeLink};
use crate::effects::{stack_effect, Component, Indices};
use crate::slots::SlotIndex;
use evmsim_evm::{mnemonic, Opcode};
use evmsim_primitives::{Address, U256};

/// Where the predicted opcode runs
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
    /// Account whose storage the frame uses
    pub address: Address,
    /// Disassembly row of the opcode
    pub row: Option<usize>,
    /// Known accounts, sorted; positions form the accounts component
    pub accounts: &'a [Address],
}

/// Storage slot read or written by SLOAD / SSTORE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotAccess {
    /// Slot operand
    pub slot: U256,
    /// Display index
    pub index: usize,
    /// Whether this prediction registered the slot
    pub registered: bool,
}

/// Effects of one opcode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prediction {
    /// Mnemonic, `INVALID` for unassigned bytes
    pub mnemonic: &'static str,
    /// Ordered effects
    pub chain: ChangeChain,
    /// Slot touched by SLOAD / SSTORE
    pub slot: Option<SlotAccess>,
}

/// Predict the effects of `byte` executing in `frame`
///
/// SLOAD and SSTORE register their slot in `slots` if it was never seen.
pub fn predict(
    byte: u8,
    stack: &StackView<'_>,
    frame: &FrameContext<'_>,
    slots: &mut SlotIndex,
) -> Prediction {
    let mut chain = ChangeChain::new();
    chain.push(ChangeLink::new(
        Component::Opcodes,
        frame.row.map(Indices::single).unwrap_or_default(),
        Indices::new(),
    ));

    let Some(opcode) = Opcode::from_byte(byte) else {
        chain.push(ChangeLink::new(Component::Stack, Indices::new(), Indices::new()));
        return Prediction {
            mnemonic: mnemonic(byte),
            chain,
            slot: None,
        };
    };

    chain.push(stack_link(opcode));

    let mut slot = None;
    if let Some(link) = memory_link(opcode, stack) {
        chain.push(link);
    } else if matches!(opcode, Opcode::SLOAD | Opcode::SSTORE) {
        if let Some(key) = stack.word(0) {
            let (index, registered) = slots.register(frame.address, &key);
            let touched = Indices::single(index);
            let link = if opcode == Opcode::SLOAD {
                ChangeLink::new(Component::Storage, touched, Indices::new())
            } else {
                ChangeLink::new(Component::Storage, Indices::new(), touched)
            };
            chain.push(link);
            slot = Some(SlotAccess {
                slot: key,
                index,
                registered,
            });
        }
    }

    if let Some(link) = accounts_link(opcode, stack, frame) {
        chain.push(link);
    }

    Prediction {
        mnemonic: opcode.name(),
        chain,
        slot,
    }
}

fn stack_link(opcode: Opcode) -> ChangeLink {
    let dup = opcode.dup_depth();
    if dup > 0 {
        return ChangeLink::new(
            Component::Stack,
            Indices::single(dup - 1),
            [0, dup].into_iter().collect(),
        );
    }
    let swap = opcode.swap_depth();
    if swap > 0 {
        let exchanged: Indices = [0, swap].into_iter().collect();
        return ChangeLink::new(Component::Stack, exchanged.clone(), exchanged);
    }
    let effect = stack_effect(opcode);
    ChangeLink::new(
        Component::Stack,
        Indices::first(effect.pops),
        Indices::first(effect.pushes),
    )
}

/// Memory words read (pre) and written (post)
fn memory_link(opcode: Opcode, stack: &StackView<'_>) -> Option<ChangeLink> {
    use Opcode::*;

    let word = U256::from(WORD_SIZE);
    let fixed = |length: U256| stack.word(0).map(|offset| word_range(offset, length)).unwrap_or_default();

    let (pre, post) = match opcode {
        MLOAD => (fixed(word), Indices::new()),
        MSTORE => (Indices::new(), fixed(word)),
        MSTORE8 => (Indices::new(), fixed(U256::one())),
        SHA3 | RETURN | REVERT | LOG0 | LOG1 | LOG2 | LOG3 | LOG4 => {
            (stack.memory_range(0, 1), Indices::new())
        }
        CALLDATACOPY | CODECOPY | RETURNDATACOPY => (Indices::new(), stack.memory_range(0, 2)),
        EXTCODECOPY => (Indices::new(), stack.memory_range(1, 3)),
        CREATE | CREATE2 => (stack.memory_range(1, 2), Indices::new()),
        CALL | CALLCODE => (stack.memory_range(3, 4), stack.memory_range(5, 6)),
        DELEGATECALL | STATICCALL => (stack.memory_range(2, 3), stack.memory_range(4, 5)),
        _ => return None,
    };
    Some(ChangeLink::new(Component::Memory, pre, post))
}

/// Accounts whose balance the opcode reads or moves
fn accounts_link(opcode: Opcode, stack: &StackView<'_>, frame: &FrameContext<'_>) -> Option<ChangeLink> {
    let position = |address: Option<Address>| -> Indices {
        address
            .and_then(|a| frame.accounts.binary_search(&a).ok())
            .map(Indices::single)
            .unwrap_or_default()
    };

    let (pre, post) = match opcode {
        Opcode::BALANCE => (position(stack.address(0)), Indices::new()),
        Opcode::SELFDESTRUCT => (position(Some(frame.address)), position(stack.address(0))),
        Opcode::CALL | Opcode::CALLCODE if stack.word(2).is_some_and(|v| !v.is_zero()) => {
            (position(Some(frame.address)), position(stack.address(1)))
        }
        _ => return None,
    };
    let link = ChangeLink::new(Component::Accounts, pre, post);
    (!link.is_empty()).then_some(link)
}
