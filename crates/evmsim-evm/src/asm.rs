//! Bytecode assembler with forward and backward labels
//!
//! ```
//! use evmsim_evm::{Assembler, Opcode};
//!
//! let code = Assembler::new()
//!     .push_label("end")
//!     .op(Opcode::JUMP)
//!     .op(Opcode::INVALID)
//!     .label("end")
//!     .op(Opcode::STOP)
//!     .build()
//!     .unwrap();
//! assert_eq!(code, vec![0x61, 0x00, 0x05, 0x56, 0xfe, 0x5b, 0x00]);
//! ```

use crate::opcode::Opcode;
use primitive_types::U256;
use std::collections::HashMap;
use thiserror::Error;

/// Assembly errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// Label referenced but never defined
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// Label defined twice
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    /// Label offset does not fit in PUSH2
    #[error("label {0} out of range")]
    LabelOutOfRange(String),

    /// Immediate longer than 32 bytes
    #[error("push immediate too long: {0} bytes")]
    ImmediateTooLong(usize),
}

/// Builder for EVM bytecode
#[derive(Clone, Debug, Default)]
pub struct Assembler {
    code: Vec<u8>,
    labels: HashMap<String, usize>,
    fixups: Vec<(usize, String)>,
    error: Option<AsmError>,
}

impl Assembler {
    /// Empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length, i.e. the pc of the next instruction
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether nothing has been emitted
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Emit a plain opcode
    pub fn op(mut self, opcode: Opcode) -> Self {
        self.code.push(opcode.as_byte());
        self
    }

    /// Emit several plain opcodes
    pub fn ops(self, opcodes: &[Opcode]) -> Self {
        opcodes.iter().fold(self, |asm, &opcode| asm.op(opcode))
    }

    /// Push a value using the shortest PUSHn
    pub fn push(self, value: impl Into<U256>) -> Self {
        let value = value.into();
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        let skip = (value.leading_zeros() / 8).min(31) as usize;
        self.push_bytes(&word[skip..])
    }

    /// Push raw bytes with PUSH(len)
    pub fn push_bytes(mut self, bytes: &[u8]) -> Self {
        if bytes.is_empty() || bytes.len() > 32 {
            self.error.get_or_insert(AsmError::ImmediateTooLong(bytes.len()));
            return self;
        }
        self.code.push(Opcode::PUSH1.as_byte() + bytes.len() as u8 - 1);
        self.code.extend_from_slice(bytes);
        self
    }

    /// Push the offset of a label as PUSH2
    pub fn push_label(mut self, name: &str) -> Self {
        self.code.push(Opcode::PUSH2.as_byte());
        self.fixups.push((self.code.len(), name.to_string()));
        self.code.extend_from_slice(&[0, 0]);
        self
    }

    /// Define a label here and emit its JUMPDEST
    pub fn label(mut self, name: &str) -> Self {
        if self.labels.insert(name.to_string(), self.code.len()).is_some() {
            self.error.get_or_insert(AsmError::DuplicateLabel(name.to_string()));
        }
        self.op(Opcode::JUMPDEST)
    }

    /// Append raw bytes, e.g. runtime code embedded after an init section
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Resolve labels and return the bytecode
    pub fn build(mut self) -> Result<Vec<u8>, AsmError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        for (at, name) in &self.fixups {
            let target = *self
                .labels
                .get(name)
                .ok_or_else(|| AsmError::UnknownLabel(name.clone()))?;
            let target = u16::try_from(target).map_err(|_| AsmError::LabelOutOfRange(name.clone()))?;
            self.code[*at..*at + 2].copy_from_slice(&target.to_be_bytes());
        }
        Ok(self.code)
    }
}

/// Init code that copies `runtime` into memory and returns it
///
/// Any `constructor` code runs first and must leave the stack empty.
pub fn deployer(constructor: &[u8], runtime: &[u8]) -> Result<Vec<u8>, AsmError> {
    // PUSH2 len PUSH2 offset PUSH1 0 CODECOPY PUSH2 len PUSH1 0 RETURN
    const TAIL: usize = 3 + 3 + 2 + 1 + 3 + 2 + 1;
    let offset = constructor.len() + TAIL;
    let len = u16::try_from(runtime.len()).map_err(|_| AsmError::ImmediateTooLong(runtime.len()))?;
    let offset_bytes = u16::try_from(offset).map_err(|_| AsmError::ImmediateTooLong(offset))?;
    Assembler::new()
        .raw(constructor)
        .push_bytes(&len.to_be_bytes())
        .push_bytes(&offset_bytes.to_be_bytes())
        .push_bytes(&[0])
        .op(Opcode::CODECOPY)
        .push_bytes(&len.to_be_bytes())
        .push_bytes(&[0])
        .op(Opcode::RETURN)
        .raw(runtime)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortest_push() {
        assert_eq!(Assembler::new().push(0u64).build().unwrap(), vec![0x60, 0x00]);
        assert_eq!(Assembler::new().push(0x1234u64).build().unwrap(), vec![0x61, 0x12, 0x34]);
        let max = Assembler::new().push(U256::MAX).build().unwrap();
        assert_eq!(max.len(), 33);
        assert_eq!(max[0], 0x7F);
    }

    #[test]
    fn test_backward_label() {
        let code = Assembler::new()
            .label("top")
            .push_label("top")
            .op(Opcode::JUMP)
            .build()
            .unwrap();
        assert_eq!(code, vec![0x5B, 0x61, 0x00, 0x00, 0x56]);
    }

    #[test]
    fn test_label_errors() {
        assert_eq!(
            Assembler::new().push_label("nowhere").build(),
            Err(AsmError::UnknownLabel("nowhere".into()))
        );
        assert_eq!(
            Assembler::new().label("a").label("a").build(),
            Err(AsmError::DuplicateLabel("a".into()))
        );
    }

    #[test]
    fn test_deployer_layout() {
        let code = deployer(&[], &[0x00]).unwrap();
        assert_eq!(code.len(), 15 + 1);
        // runtime starts right after the tail
        assert_eq!(code[4..6], [0x00, 0x0F]);
        assert_eq!(*code.last().unwrap(), 0x00);
    }
}
