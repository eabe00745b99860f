//! Hex formatting and numeric parsing for display and user input

use crate::error::{PrimitiveError, PrimitiveResult};
use primitive_types::U256;

/// Format a word as `0x`-prefixed lowercase hex padded to an even number of digits.
///
/// `1 -> "0x01"`, `255 -> "0xff"`, `256 -> "0x0100"`, `0 -> "0x00"`.
pub fn word_to_hex(word: &U256) -> String {
    let digits = format!("{:x}", word);
    if digits.len() % 2 == 1 {
        format!("0x0{}", digits)
    } else {
        format!("0x{}", digits)
    }
}

/// Format raw bytes as `0x`-prefixed lowercase hex
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a hex string, with or without `0x` prefix
pub fn decode_hex(s: &str) -> PrimitiveResult<Vec<u8>> {
    let s = strip_prefix(s.trim());
    hex::decode(s).map_err(|e| PrimitiveError::InvalidHex(e.to_string()))
}

/// Parse a 256-bit number written either in decimal or as `0x` hex
pub fn parse_word(s: &str) -> PrimitiveResult<U256> {
    let s = s.trim();
    if s.is_empty() {
        return Err(PrimitiveError::InvalidNumber(String::new()));
    }
    if s.starts_with("0x") || s.starts_with("0X") {
        let digits = strip_prefix(s);
        if digits.is_empty() {
            return Ok(U256::zero());
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PrimitiveError::InvalidNumber(s.to_string()));
        }
        if digits.trim_start_matches('0').len() > 64 {
            return Err(PrimitiveError::OutOfRange(s.to_string()));
        }
        return U256::from_str_radix(digits, 16)
            .map_err(|_| PrimitiveError::InvalidNumber(s.to_string()));
    }
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(PrimitiveError::InvalidNumber(s.to_string()));
    }
    U256::from_dec_str(s).map_err(|_| PrimitiveError::OutOfRange(s.to_string()))
}

/// Parse a number that must fit into 128 bits (balances, values)
pub fn parse_u128(s: &str) -> PrimitiveResult<u128> {
    let word = parse_word(s)?;
    if word > U256::from(u128::MAX) {
        return Err(PrimitiveError::OutOfRange(s.trim().to_string()));
    }
    Ok(word.low_u128())
}

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
