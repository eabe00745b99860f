//! EVM opcode definitions (Istanbul instruction set)

use std::fmt;

macro_rules! opcodes {
    ($($name:ident = $byte:literal,)*) => {
        /// EVM opcodes (see Yellow Paper Appendix H)
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        #[allow(missing_docs)]
        pub enum Opcode {
            $($name = $byte,)*
        }

        impl Opcode {
            /// Decode a byte, `None` for unassigned values
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Opcode::$name),)*
                    _ => None,
                }
            }

            /// Mnemonic
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name),)*
                }
            }
        }
    };
}

opcodes! {
    STOP = 0x00,
    ADD = 0x01,
    MUL = 0x02,
    SUB = 0x03,
    DIV = 0x04,
    SDIV = 0x05,
    MOD = 0x06,
    SMOD = 0x07,
    ADDMOD = 0x08,
    MULMOD = 0x09,
    EXP = 0x0A,
    SIGNEXTEND = 0x0B,

    LT = 0x10,
    GT = 0x11,
    SLT = 0x12,
    SGT = 0x13,
    EQ = 0x14,
    ISZERO = 0x15,
    AND = 0x16,
    OR = 0x17,
    XOR = 0x18,
    NOT = 0x19,
    BYTE = 0x1A,
    SHL = 0x1B,
    SHR = 0x1C,
    SAR = 0x1D,

    SHA3 = 0x20,

    ADDRESS = 0x30,
    BALANCE = 0x31,
    ORIGIN = 0x32,
    CALLER = 0x33,
    CALLVALUE = 0x34,
    CALLDATALOAD = 0x35,
    CALLDATASIZE = 0x36,
    CALLDATACOPY = 0x37,
    CODESIZE = 0x38,
    CODECOPY = 0x39,
    GASPRICE = 0x3A,
    EXTCODESIZE = 0x3B,
    EXTCODECOPY = 0x3C,
    RETURNDATASIZE = 0x3D,
    RETURNDATACOPY = 0x3E,
    EXTCODEHASH = 0x3F,

    BLOCKHASH = 0x40,
    COINBASE = 0x41,
    TIMESTAMP = 0x42,
    NUMBER = 0x43,
    DIFFICULTY = 0x44,
    GASLIMIT = 0x45,
    CHAINID = 0x46,
    SELFBALANCE = 0x47,

    POP = 0x50,
    MLOAD = 0x51,
    MSTORE = 0x52,
    MSTORE8 = 0x53,
    SLOAD = 0x54,
    SSTORE = 0x55,
    JUMP = 0x56,
    JUMPI = 0x57,
    PC = 0x58,
    MSIZE = 0x59,
    GAS = 0x5A,
    JUMPDEST = 0x5B,

    PUSH1 = 0x60,
    PUSH2 = 0x61,
    PUSH3 = 0x62,
    PUSH4 = 0x63,
    PUSH5 = 0x64,
    PUSH6 = 0x65,
    PUSH7 = 0x66,
    PUSH8 = 0x67,
    PUSH9 = 0x68,
    PUSH10 = 0x69,
    PUSH11 = 0x6A,
    PUSH12 = 0x6B,
    PUSH13 = 0x6C,
    PUSH14 = 0x6D,
    PUSH15 = 0x6E,
    PUSH16 = 0x6F,
    PUSH17 = 0x70,
    PUSH18 = 0x71,
    PUSH19 = 0x72,
    PUSH20 = 0x73,
    PUSH21 = 0x74,
    PUSH22 = 0x75,
    PUSH23 = 0x76,
    PUSH24 = 0x77,
    PUSH25 = 0x78,
    PUSH26 = 0x79,
    PUSH27 = 0x7A,
    PUSH28 = 0x7B,
    PUSH29 = 0x7C,
    PUSH30 = 0x7D,
    PUSH31 = 0x7E,
    PUSH32 = 0x7F,

    DUP1 = 0x80,
    DUP2 = 0x81,
    DUP3 = 0x82,
    DUP4 = 0x83,
    DUP5 = 0x84,
    DUP6 = 0x85,
    DUP7 = 0x86,
    DUP8 = 0x87,
    DUP9 = 0x88,
    DUP10 = 0x89,
    DUP11 = 0x8A,
    DUP12 = 0x8B,
    DUP13 = 0x8C,
    DUP14 = 0x8D,
    DUP15 = 0x8E,
    DUP16 = 0x8F,

    SWAP1 = 0x90,
    SWAP2 = 0x91,
    SWAP3 = 0x92,
    SWAP4 = 0x93,
    SWAP5 = 0x94,
    SWAP6 = 0x95,
    SWAP7 = 0x96,
    SWAP8 = 0x97,
    SWAP9 = 0x98,
    SWAP10 = 0x99,
    SWAP11 = 0x9A,
    SWAP12 = 0x9B,
    SWAP13 = 0x9C,
    SWAP14 = 0x9D,
    SWAP15 = 0x9E,
    SWAP16 = 0x9F,

    LOG0 = 0xA0,
    LOG1 = 0xA1,
    LOG2 = 0xA2,
    LOG3 = 0xA3,
    LOG4 = 0xA4,

    CREATE = 0xF0,
    CALL = 0xF1,
    CALLCODE = 0xF2,
    RETURN = 0xF3,
    DELEGATECALL = 0xF4,
    CREATE2 = 0xF5,
    STATICCALL = 0xFA,
    REVERT = 0xFD,
    INVALID = 0xFE,
    SELFDESTRUCT = 0xFF,
}

impl Opcode {
    /// Opcode byte
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Immediate size for PUSH1..PUSH32 (0 otherwise)
    pub fn push_size(self) -> usize {
        push_size(self as u8)
    }

    /// Depth for DUP1..DUP16 (0 otherwise)
    pub fn dup_depth(self) -> usize {
        match self as u8 {
            b @ 0x80..=0x8F => (b - 0x7F) as usize,
            _ => 0,
        }
    }

    /// Depth for SWAP1..SWAP16 (0 otherwise)
    pub fn swap_depth(self) -> usize {
        match self as u8 {
            b @ 0x90..=0x9F => (b - 0x8F) as usize,
            _ => 0,
        }
    }

    /// Topic count for LOG0..LOG4
    pub fn log_topics(self) -> Option<usize> {
        match self as u8 {
            b @ 0xA0..=0xA4 => Some((b - 0xA0) as usize),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immediate size of a raw opcode byte
pub fn push_size(byte: u8) -> usize {
    match byte {
        0x60..=0x7F => (byte - 0x5F) as usize,
        _ => 0,
    }
}

/// Mnemonic of a raw byte, `INVALID` for unassigned values
pub fn mnemonic(byte: u8) -> &'static str {
    Opcode::from_byte(byte).map(Opcode::name).unwrap_or("INVALID")
}

/// One row of a disassembly
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode byte
    pub pc: usize,
    /// Raw opcode byte
    pub byte: u8,
    /// Mnemonic
    pub mnemonic: &'static str,
    /// PUSH immediate, zero padded when the code ends early
    pub immediate: Vec<u8>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x} {}", self.pc, self.mnemonic)?;
        if !self.immediate.is_empty() {
            write!(f, " 0x{}", hex::encode(&self.immediate))?;
        }
        Ok(())
    }
}

/// Split bytecode into instructions, skipping PUSH immediates
pub fn disassemble(code: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        let size = push_size(byte);
        let mut immediate = vec![0u8; size];
        let available = code.len().saturating_sub(pc + 1).min(size);
        immediate[..available].copy_from_slice(&code[pc + 1..pc + 1 + available]);
        instructions.push(Instruction {
            pc,
            byte,
            mnemonic: mnemonic(byte),
            immediate,
        });
        pc += 1 + size;
    }
    instructions
}

/// Row of the instruction starting at `pc`
pub fn instruction_index(instructions: &[Instruction], pc: usize) -> Option<usize> {
    instructions.binary_search_by_key(&pc, |i| i.pc).ok()
}
