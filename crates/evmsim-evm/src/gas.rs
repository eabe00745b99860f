//! Constant gas pricing
//!
//! Costs follow the pre-Berlin schedule without warm/cold access tracking.
//! SSTORE uses the simple set/reset/clear rule instead of net metering.

use crate::opcode::Opcode;
use primitive_types::U256;

/// Gas costs for EVM operations
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;

    /// JUMPDEST gas
    pub const JUMPDEST: u64 = 1;
    /// EXP base gas
    pub const EXP: u64 = 10;
    /// EXP gas per exponent byte
    pub const EXP_BYTE: u64 = 50;
    /// SHA3 base gas
    pub const SHA3: u64 = 30;
    /// SHA3 gas per word
    pub const SHA3_WORD: u64 = 6;

    /// BALANCE, EXTCODESIZE, EXTCODECOPY base and EXTCODEHASH
    pub const EXTERNAL_ACCOUNT: u64 = 700;
    /// SELFBALANCE
    pub const SELFBALANCE: u64 = 5;
    /// BLOCKHASH
    pub const BLOCKHASH: u64 = 20;
    /// SLOAD
    pub const SLOAD: u64 = 800;
    /// SSTORE zero to non-zero
    pub const SSTORE_SET: u64 = 20000;
    /// SSTORE any other write
    pub const SSTORE_RESET: u64 = 5000;
    /// Refund for clearing a slot
    pub const SSTORE_CLEAR_REFUND: u64 = 15000;

    /// LOG base gas
    pub const LOG: u64 = 375;
    /// LOG gas per topic
    pub const LOG_TOPIC: u64 = 375;
    /// LOG gas per data byte
    pub const LOG_DATA: u64 = 8;

    /// CREATE and CREATE2
    pub const CREATE: u64 = 32000;
    /// Gas per byte of deployed code
    pub const CODE_DEPOSIT: u64 = 200;
    /// CALL family base
    pub const CALL: u64 = 700;
    /// Surcharge for value transfer
    pub const CALL_VALUE: u64 = 9000;
    /// Surcharge for calling a non-existent account with value
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Gas handed to the callee for free on value transfer
    pub const CALL_STIPEND: u64 = 2300;

    /// SELFDESTRUCT
    pub const SELFDESTRUCT: u64 = 5000;
    /// SELFDESTRUCT to a non-existent beneficiary
    pub const SELFDESTRUCT_NEW_ACCOUNT: u64 = 25000;
    /// Refund for SELFDESTRUCT
    pub const SELFDESTRUCT_REFUND: u64 = 24000;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Transaction gas
    pub const TX: u64 = 21000;
    /// Contract creation surcharge
    pub const TX_CREATE: u64 = 32000;
    /// Transaction data zero byte
    pub const TX_DATA_ZERO: u64 = 4;
    /// Transaction data non-zero byte
    pub const TX_DATA_NONZERO: u64 = 16;

    /// Max call depth
    pub const MAX_CALL_DEPTH: usize = 1024;
    /// Max stack size
    pub const MAX_STACK_SIZE: usize = 1024;
    /// Max code size (EIP-170)
    pub const MAX_CODE_SIZE: usize = 24576;
}

/// Static gas charged before an opcode runs
pub fn static_gas(opcode: Opcode) -> u64 {
    use Opcode::*;
    match opcode {
        STOP | RETURN | REVERT => cost::ZERO,

        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE | COINBASE
        | TIMESTAMP | NUMBER | DIFFICULTY | GASLIMIT | CHAINID | RETURNDATASIZE | POP | PC
        | MSIZE | GAS => cost::BASE,

        ADD | SUB | NOT | LT | GT | SLT | SGT | EQ | ISZERO | AND | OR | XOR | BYTE | SHL | SHR
        | SAR | CALLDATALOAD | MLOAD | MSTORE | MSTORE8 | CALLDATACOPY | CODECOPY
        | RETURNDATACOPY => cost::VERYLOW,

        MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND | SELFBALANCE => cost::LOW,

        ADDMOD | MULMOD | JUMP => cost::MID,

        JUMPI => cost::HIGH,

        EXP => cost::EXP,
        SHA3 => cost::SHA3,
        JUMPDEST => cost::JUMPDEST,
        BLOCKHASH => cost::BLOCKHASH,
        BALANCE | EXTCODESIZE | EXTCODECOPY | EXTCODEHASH => cost::EXTERNAL_ACCOUNT,
        SLOAD => cost::SLOAD,
        SSTORE => cost::ZERO,

        LOG0 | LOG1 | LOG2 | LOG3 | LOG4 => cost::LOG,

        CREATE | CREATE2 => cost::CREATE,
        CALL | CALLCODE | DELEGATECALL | STATICCALL => cost::CALL,
        SELFDESTRUCT => cost::SELFDESTRUCT,
        INVALID => cost::ZERO,

        _ => cost::VERYLOW, // PUSH, DUP, SWAP
    }
}

/// Number of 32-byte words covering `size` bytes
pub fn words(size: usize) -> u64 {
    size.div_ceil(32) as u64
}

/// Total cost of `size` bytes of memory: 3 * words + words^2 / 512
pub fn memory_cost(size: usize) -> u64 {
    let w = words(size);
    cost::MEMORY
        .saturating_mul(w)
        .saturating_add(w.saturating_mul(w) / 512)
}

/// Cost of growing memory from `current` to `new` bytes
pub fn memory_expansion_cost(current: usize, new: usize) -> u64 {
    if new <= current {
        return 0;
    }
    memory_cost(new).saturating_sub(memory_cost(current))
}

/// Copy cost for `size` bytes
pub fn copy_gas(size: usize) -> u64 {
    cost::COPY.saturating_mul(words(size))
}

/// Per-word SHA3 cost for `size` bytes
pub fn sha3_gas(size: usize) -> u64 {
    cost::SHA3_WORD.saturating_mul(words(size))
}

/// Dynamic EXP cost
pub fn exp_gas(exponent: &U256) -> u64 {
    let bytes = exponent.bits().div_ceil(8) as u64;
    cost::EXP_BYTE * bytes
}

/// Dynamic LOG cost
pub fn log_gas(topics: usize, size: usize) -> u64 {
    (cost::LOG_TOPIC * topics as u64).saturating_add(cost::LOG_DATA.saturating_mul(size as u64))
}

/// SSTORE cost and refund for writing `new` over `current`
pub fn sstore_gas(current: &U256, new: &U256) -> (u64, u64) {
    if current.is_zero() && !new.is_zero() {
        (cost::SSTORE_SET, 0)
    } else if !current.is_zero() && new.is_zero() {
        (cost::SSTORE_RESET, cost::SSTORE_CLEAR_REFUND)
    } else {
        (cost::SSTORE_RESET, 0)
    }
}

/// All but one 64th (EIP-150)
pub fn all_but_one_64th(gas: u64) -> u64 {
    gas - gas / 64
}

/// Intrinsic transaction gas
pub fn intrinsic_gas(data: &[u8], is_create: bool) -> u64 {
    let data_gas: u64 = data
        .iter()
        .map(|&b| {
            if b == 0 {
                cost::TX_DATA_ZERO
            } else {
                cost::TX_DATA_NONZERO
            }
        })
        .sum();
    let create = if is_create { cost::TX_CREATE } else { 0 };
    cost::TX + data_gas + create
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_gas_tiers() {
        assert_eq!(static_gas(Opcode::STOP), 0);
        assert_eq!(static_gas(Opcode::ADD), 3);
        assert_eq!(static_gas(Opcode::MUL), 5);
        assert_eq!(static_gas(Opcode::JUMPI), 10);
        assert_eq!(static_gas(Opcode::PUSH32), 3);
        assert_eq!(static_gas(Opcode::SWAP16), 3);
        assert_eq!(static_gas(Opcode::SLOAD), 800);
        assert_eq!(static_gas(Opcode::CALL), 700);
    }

    #[test]
    fn test_memory_cost() {
        assert_eq!(memory_cost(0), 0);
        assert_eq!(memory_cost(1), 3);
        assert_eq!(memory_cost(32), 3);
        assert_eq!(memory_cost(64), 6);
        // 1024 words: 3 * 1024 + 1024^2 / 512
        assert_eq!(memory_cost(32 * 1024), 3072 + 2048);
        assert_eq!(memory_expansion_cost(32, 64), 3);
        assert_eq!(memory_expansion_cost(64, 32), 0);
    }

    #[test]
    fn test_exp_gas() {
        assert_eq!(exp_gas(&U256::zero()), 0);
        assert_eq!(exp_gas(&U256::from(255)), 50);
        assert_eq!(exp_gas(&U256::from(256)), 100);
    }

    #[test]
    fn test_sstore_gas() {
        let zero = U256::zero();
        let one = U256::one();
        assert_eq!(sstore_gas(&zero, &one), (20000, 0));
        assert_eq!(sstore_gas(&one, &zero), (5000, 15000));
        assert_eq!(sstore_gas(&one, &U256::from(2)), (5000, 0));
        assert_eq!(sstore_gas(&zero, &zero), (5000, 0));
    }

    #[test]
    fn test_intrinsic_gas() {
        assert_eq!(intrinsic_gas(&[], false), 21000);
        assert_eq!(intrinsic_gas(&[0, 1], false), 21000 + 4 + 16);
        assert_eq!(intrinsic_gas(&[], true), 53000);
    }

    #[test]
    fn test_all_but_one_64th() {
        assert_eq!(all_but_one_64th(6400), 6300);
        assert_eq!(all_but_one_64th(63), 63);
    }
}
