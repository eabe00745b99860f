//! Read-only views over a frame's stack, memory and storage
//!
//! The predictor and the step controller only ever look at execution state
//! through these views, so no debugging code can mutate a frame.

use crate::effects::Indices;
use evmsim_evm::{Memory, Stack, StackValue};
use evmsim_primitives::{word_to_hex, Address, H256, U256};
use evmsim_state::{StateReader, WorldState};

/// Bytes per memory word
pub const WORD_SIZE: usize = 32;

/// Word indices covered by the byte range `[offset, offset + length)`
///
/// The range is `floor(offset / 32) ..= ceil((offset + length) / 32)`,
/// inclusive at both ends. A zero length touches nothing. Ranges whose end
/// does not fit in `u32` cannot be paid for and are reported empty.
pub fn word_range(offset: U256, length: U256) -> Indices {
    if length.is_zero() {
        return Indices::new();
    }
    let end = match offset.checked_add(length) {
        Some(end) if end <= U256::from(u32::MAX) => end.as_usize(),
        _ => return Indices::new(),
    };
    let start = offset.as_usize() / WORD_SIZE;
    Indices::range(start, end.div_ceil(WORD_SIZE))
}

/// Canonical text form of a storage slot: even-length `0x` hex
pub fn slot_key(slot: &U256) -> String {
    word_to_hex(slot)
}

/// Positional view of a stack, top first
#[derive(Clone, Copy, Debug)]
pub struct StackView<'a> {
    stack: &'a Stack,
}

impl<'a> StackView<'a> {
    /// View over `stack`
    pub fn new(stack: &'a Stack) -> Self {
        Self { stack }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Item at `depth` from the top
    pub fn peek(&self, depth: usize) -> Option<&'a StackValue> {
        self.stack.peek(depth).ok()
    }

    /// Numeric value at `depth`
    pub fn word(&self, depth: usize) -> Option<U256> {
        self.peek(depth).map(StackValue::as_u256)
    }

    /// Address held at `depth`
    pub fn address(&self, depth: usize) -> Option<Address> {
        self.peek(depth).map(StackValue::as_address)
    }

    /// Word range of the `(offset, length)` operands at the given depths
    ///
    /// Empty when either operand is missing.
    pub fn memory_range(&self, offset_depth: usize, length_depth: usize) -> Indices {
        match (self.word(offset_depth), self.word(length_depth)) {
            (Some(offset), Some(length)) => word_range(offset, length),
            _ => Indices::new(),
        }
    }

    /// Items top first
    pub fn top_first(&self) -> Vec<StackValue> {
        self.stack.values().iter().rev().cloned().collect()
    }
}

/// Word-aligned view of a frame's memory
#[derive(Clone, Copy, Debug)]
pub struct MemoryView<'a> {
    memory: &'a Memory,
}

impl<'a> MemoryView<'a> {
    /// View over `memory`
    pub fn new(memory: &'a Memory) -> Self {
        Self { memory }
    }

    /// Word `index`, zero past the end
    pub fn word(&self, index: usize) -> [u8; WORD_SIZE] {
        let mut word = [0u8; WORD_SIZE];
        let data = self.memory.data();
        let start = index.saturating_mul(WORD_SIZE);
        if start < data.len() {
            let end = (start + WORD_SIZE).min(data.len());
            word[..end - start].copy_from_slice(&data[start..end]);
        }
        word
    }

    /// Raw bytes
    pub fn bytes(&self) -> &'a [u8] {
        self.memory.data()
    }
}

/// Storage of one account
#[derive(Clone, Copy)]
pub struct StorageView<'a> {
    state: &'a WorldState,
    address: Address,
}

impl<'a> StorageView<'a> {
    /// View over the storage of `address`
    pub fn new(state: &'a WorldState, address: Address) -> Self {
        Self { state, address }
    }

    /// Account whose storage is viewed
    pub fn address(&self) -> Address {
        self.address
    }

    /// Value at `slot`, zero when unset
    pub fn get(&self, slot: &U256) -> U256 {
        self.state.storage(&self.address, &H256::from_word(*slot)).to_word()
    }

    /// Every non-zero slot, ordered by key
    pub fn entries(&self) -> Vec<(U256, U256)> {
        let mut entries: Vec<_> = self
            .state
            .storage_entries(&self.address)
            .into_iter()
            .map(|(key, value)| (key.to_word(), value.to_word()))
            .collect();
        entries.sort();
        entries
    }
}
