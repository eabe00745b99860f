//! Change chains and step history
//!
//! A [`ChangeChain`] lists, for one opcode, every component it touches and
//! which indices to highlight before and after execution. The [`History`]
//! records one entry per executed step for later replay.

use crate::effects::{Component, Indices};
use evmsim_evm::StackValue;
use evmsim_primitives::{Address, U256};

/// Effect of one opcode on one component
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeLink {
    /// Component affected
    pub component: Component,
    /// Indices to highlight before execution
    pub pre: Indices,
    /// Indices to highlight after execution
    pub post: Indices,
}

impl ChangeLink {
    /// New link
    pub fn new(component: Component, pre: Indices, post: Indices) -> Self {
        Self { component, pre, post }
    }

    /// Whether neither phase highlights anything
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }
}

/// Ordered effects of one opcode
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeChain {
    links: Vec<ChangeLink>,
}

impl ChangeChain {
    /// Empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a link
    pub fn push(&mut self, link: ChangeLink) {
        self.links.push(link);
    }

    /// Links in insertion order
    pub fn links(&self) -> &[ChangeLink] {
        &self.links
    }

    /// First link for `component`
    pub fn link(&self, component: Component) -> Option<&ChangeLink> {
        self.links.iter().find(|link| link.component == component)
    }

    /// Every link for `component`
    pub fn links_for(&self, component: Component) -> impl Iterator<Item = &ChangeLink> {
        self.links.iter().filter(move |link| link.component == component)
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain has no links
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<'a> IntoIterator for &'a ChangeChain {
    type Item = &'a ChangeLink;
    type IntoIter = std::slice::Iter<'a, ChangeLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

/// Frame state at a step boundary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepSnapshot {
    /// Program counter
    pub pc: usize,
    /// Gas left in the frame
    pub gas_remaining: u64,
    /// Stack, top first
    pub stack: Vec<StackValue>,
    /// Memory bytes
    pub memory: Vec<u8>,
}

/// One storage write observed during a step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageDelta {
    /// Account written
    pub address: Address,
    /// Slot written
    pub slot: U256,
    /// New value
    pub value: U256,
    /// Display index of the slot
    pub index: usize,
}

/// Record of one executed opcode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Call depth of the frame
    pub depth: usize,
    /// Opcode byte
    pub opcode: u8,
    /// Predicted effects
    pub chain: ChangeChain,
    /// State before execution
    pub pre: StepSnapshot,
    /// State after execution; `None` when the step ended its frame abnormally
    pub post: Option<StepSnapshot>,
    /// Gas charged for the opcode
    pub gas_cost: u64,
    /// Storage writes made by the opcode
    pub storage: Vec<StorageDelta>,
}

/// Append-only step log with a replay cursor
///
/// The cursor sits between entries: 0 is before the first one and
/// `len()` after the last one.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl History {
    /// Empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry; called when a session starts
    pub fn reset(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Open an entry for the opcode about to execute, returning its index
    ///
    /// Entries of nested frames are opened while the calling opcode is
    /// still open, so writes and closes address an entry by index.
    pub fn begin_step(&mut self, depth: usize, opcode: u8, chain: ChangeChain, pre: StepSnapshot) -> usize {
        self.entries.push(HistoryEntry {
            depth,
            opcode,
            chain,
            pre,
            post: None,
            gas_cost: 0,
            storage: Vec::new(),
        });
        self.cursor = self.entries.len();
        self.entries.len() - 1
    }

    /// Attach a storage write to entry `index`
    pub fn record_storage(&mut self, index: usize, delta: StorageDelta) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.storage.push(delta);
        }
    }

    /// Close entry `index`
    pub fn finish_step(&mut self, index: usize, post: StepSnapshot, gas_cost: u64) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.post = Some(post);
            entry.gas_cost = gas_cost;
        }
    }

    /// Recorded steps
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor position
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Move the cursor before the first entry
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Entry after the cursor, advancing past it
    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        let entry = self.entries.get(self.cursor)?;
        self.cursor += 1;
        Some(entry)
    }

    /// Entry before the cursor, stepping back over it
    pub fn back(&mut self) -> Option<&HistoryEntry> {
        self.cursor = self.cursor.checked_sub(1)?;
        self.entries.get(self.cursor)
    }

    /// Move the cursor to `position`, clamped to the end
    pub fn seek(&mut self, position: usize) {
        self.cursor = position.min(self.entries.len());
    }
}
