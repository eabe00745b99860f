//! Effect table: which stack positions each opcode reads and writes
//!
//! Stack positions count from the top, so position 0 is the top item.

use evmsim_evm::Opcode;
use std::fmt;
use std::ops::RangeInclusive;

/// Part of the execution state an effect refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// Disassembly rows
    Opcodes,
    /// Stack positions, top first
    Stack,
    /// 32-byte memory words
    Memory,
    /// Display indices of storage slots
    Storage,
    /// Positions in the known-account list
    Accounts,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Opcodes => "opcodes",
            Component::Stack => "stack",
            Component::Memory => "memory",
            Component::Storage => "storage",
            Component::Accounts => "accounts",
        };
        f.write_str(name)
    }
}

/// Items an opcode pops and pushes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackEffect {
    /// Items consumed
    pub pops: usize,
    /// Items produced
    pub pushes: usize,
}

impl StackEffect {
    const fn new(pops: usize, pushes: usize) -> Self {
        Self { pops, pushes }
    }

    /// Change in stack height
    pub fn delta(&self) -> isize {
        self.pushes as isize - self.pops as isize
    }
}

/// Stack effect of a raw opcode byte, `None` for unassigned bytes
pub fn stack_effect_of(byte: u8) -> Option<StackEffect> {
    Opcode::from_byte(byte).map(stack_effect)
}

/// Stack effect of an opcode
pub fn stack_effect(opcode: Opcode) -> StackEffect {
    use Opcode::*;

    let dup = opcode.dup_depth();
    if dup > 0 {
        return StackEffect::new(dup, dup + 1);
    }
    let swap = opcode.swap_depth();
    if swap > 0 {
        return StackEffect::new(swap + 1, swap + 1);
    }
    if opcode.push_size() > 0 {
        return StackEffect::new(0, 1);
    }
    if let Some(topics) = opcode.log_topics() {
        return StackEffect::new(topics + 2, 0);
    }

    match opcode {
        STOP | JUMPDEST | INVALID => StackEffect::new(0, 0),
        ADD | MUL | SUB | DIV | SDIV | MOD | SMOD | EXP | SIGNEXTEND | LT | GT | SLT | SGT | EQ
        | AND | OR | XOR | BYTE | SHL | SHR | SAR | SHA3 => StackEffect::new(2, 1),
        ADDMOD | MULMOD => StackEffect::new(3, 1),
        ISZERO | NOT | BALANCE | CALLDATALOAD | EXTCODESIZE | EXTCODEHASH | BLOCKHASH | MLOAD
        | SLOAD => StackEffect::new(1, 1),
        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE
        | RETURNDATASIZE | COINBASE | TIMESTAMP | NUMBER | DIFFICULTY | GASLIMIT | CHAINID
        | SELFBALANCE | PC | MSIZE | GAS => StackEffect::new(0, 1),
        CALLDATACOPY | CODECOPY | RETURNDATACOPY => StackEffect::new(3, 0),
        EXTCODECOPY => StackEffect::new(4, 0),
        POP | JUMP | SELFDESTRUCT => StackEffect::new(1, 0),
        MSTORE | MSTORE8 | SSTORE | JUMPI | RETURN | REVERT => StackEffect::new(2, 0),
        CREATE => StackEffect::new(3, 1),
        CREATE2 => StackEffect::new(4, 1),
        CALL | CALLCODE => StackEffect::new(7, 1),
        DELEGATECALL | STATICCALL => StackEffect::new(6, 1),
        // families handled above
        _ => StackEffect::new(0, 0),
    }
}

/// Set of indices, stored as inclusive ranges in insertion order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Indices(Vec<RangeInclusive<usize>>);

impl Indices {
    /// No indices
    pub fn new() -> Self {
        Self::default()
    }

    /// One index
    pub fn single(index: usize) -> Self {
        Self(vec![index..=index])
    }

    /// `start..=end`
    pub fn range(start: usize, end: usize) -> Self {
        Self(vec![start..=end])
    }

    /// `0..count`, empty when `count` is zero
    pub fn first(count: usize) -> Self {
        match count {
            0 => Self::new(),
            n => Self::range(0, n - 1),
        }
    }

    /// Add one index
    pub fn push(&mut self, index: usize) {
        self.0.push(index..=index);
    }

    /// Whether no index is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `index` is set
    pub fn contains(&self, index: usize) -> bool {
        self.0.iter().any(|r| r.contains(&index))
    }

    /// Number of indices
    pub fn len(&self) -> usize {
        self.0.iter().map(|r| r.end() + 1 - r.start()).sum()
    }

    /// Underlying ranges
    pub fn ranges(&self) -> &[RangeInclusive<usize>] {
        &self.0
    }

    /// Every index, range by range
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().flat_map(|r| r.clone())
    }
}

impl FromIterator<usize> for Indices {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().map(|i| i..=i).collect())
    }
}

impl fmt::Display for Indices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, range) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if range.start() == range.end() {
                write!(f, "{}", range.start())?;
            } else {
                write!(f, "{}..={}", range.start(), range.end())?;
            }
        }
        f.write_str("}")
    }
}
