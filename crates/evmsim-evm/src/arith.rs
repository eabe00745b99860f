//! Signed and modular word arithmetic

use primitive_types::{U256, U512};

fn is_negative(value: &U256) -> bool {
    value.bit(255)
}

fn twos_complement(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(&value) {
        twos_complement(value)
    } else {
        value
    }
}

/// SDIV
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(&a) != is_negative(&b) {
        twos_complement(quotient)
    } else {
        quotient
    }
}

/// SMOD, result takes the sign of the dividend
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let remainder = abs(a) % abs(b);
    if is_negative(&a) {
        twos_complement(remainder)
    } else {
        remainder
    }
}

/// SLT
pub fn slt(a: &U256, b: &U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// SGT
pub fn sgt(a: &U256, b: &U256) -> bool {
    slt(b, a)
}

/// ADDMOD without intermediate overflow
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let sum = U512::from(a) + U512::from(b);
    narrow(sum % U512::from(n))
}

/// MULMOD without intermediate overflow
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    narrow(a.full_mul(b) % U512::from(n))
}

fn narrow(value: U512) -> U256 {
    U256::try_from(value).unwrap_or_default()
}

/// EXP modulo 2^256
pub fn exp(base: U256, exponent: U256) -> U256 {
    base.overflowing_pow(exponent).0
}

/// SIGNEXTEND from byte `b` (0 = least significant)
pub fn signextend(b: U256, x: U256) -> U256 {
    if b >= U256::from(31) {
        return x;
    }
    let bit = b.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit) - U256::one();
    if x.bit(bit) {
        x | !mask
    } else {
        x & mask
    }
}

/// BYTE: `i`-th most significant byte of `x`
pub fn byte(i: U256, x: U256) -> U256 {
    if i >= U256::from(32) {
        return U256::zero();
    }
    U256::from(x.byte(31 - i.low_u64() as usize))
}

/// SHL
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        return U256::zero();
    }
    value << shift.low_u64() as usize
}

/// SHR
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        return U256::zero();
    }
    value >> shift.low_u64() as usize
}

/// SAR
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(&value);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    let shifted = value >> shift;
    if negative && shift > 0 {
        shifted | (U256::MAX << (256 - shift))
    } else {
        shifted
    }
}
