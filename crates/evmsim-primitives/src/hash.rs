//! 32-byte hash type, also used as storage key and value

use crate::error::{PrimitiveError, PrimitiveResult};
use primitive_types::U256;
use std::fmt;

/// 256-bit hash (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct H256([u8; 32]);

impl H256 {
    /// Size in bytes
    pub const LEN: usize = 32;

    /// Zero hash
    pub const ZERO: H256 = H256([0u8; 32]);

    /// Create from bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }

    /// Create from a slice of exactly 32 bytes
    pub fn from_slice(slice: &[u8]) -> PrimitiveResult<Self> {
        if slice.len() != Self::LEN {
            return Err(PrimitiveError::InvalidLength {
                expected: Self::LEN,
                got: slice.len(),
            });
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(H256(bytes))
    }

    /// Parse from a hex string (with or without `0x`)
    pub fn from_hex(s: &str) -> PrimitiveResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| PrimitiveError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Big-endian encoding of a word
    pub fn from_word(word: U256) -> Self {
        let mut bytes = [0u8; 32];
        word.to_big_endian(&mut bytes);
        H256(bytes)
    }

    /// Interpret as a big-endian word
    pub fn to_word(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check for all-zero bytes
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.to_hex())
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }
}

impl From<U256> for H256 {
    fn from(word: U256) -> Self {
        H256::from_word(word)
    }
}

impl AsRef<[u8]> for H256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "rlp")]
mod rlp_impl {
    use super::*;
    use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

    impl Encodable for H256 {
        fn rlp_append(&self, s: &mut RlpStream) {
            s.encoder().encode_value(&self.0);
        }
    }

    impl Decodable for H256 {
        fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
            rlp.decoder().decode_value(|bytes| {
                H256::from_slice(bytes).map_err(|_| DecoderError::RlpInvalidLength)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h256_from_hex() {
        let hash = H256::from_hex(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(hash.as_bytes()[31], 1);
        assert_eq!(hash.to_word(), U256::one());
    }

    #[test]
    fn test_h256_word_roundtrip_keeps_leading_zeros() {
        let hash = H256::from_word(U256::from(0x1234));
        assert_eq!(
            hash.to_hex(),
            "0x0000000000000000000000000000000000000000000000000000000000001234"
        );
        assert!(!hash.is_zero());
        assert!(H256::from_word(U256::zero()).is_zero());
    }

    #[test]
    fn test_h256_invalid_length() {
        assert!(matches!(
            H256::from_slice(&[0u8; 31]),
            Err(PrimitiveError::InvalidLength { expected: 32, got: 31 })
        ));
    }
}
