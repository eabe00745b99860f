//! 20-byte account address

use crate::error::{PrimitiveError, PrimitiveResult};
use primitive_types::U256;
use std::fmt;
use std::str::FromStr;

/// Ethereum-compatible 20-byte address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// Size of an address in bytes
    pub const LEN: usize = 20;

    /// Zero address, also the recipient of contract-creation transactions
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an address from raw bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Create an address from a slice of exactly 20 bytes
    pub fn from_slice(slice: &[u8]) -> PrimitiveResult<Self> {
        if slice.len() != Self::LEN {
            return Err(PrimitiveError::InvalidLength {
                expected: Self::LEN,
                got: slice.len(),
            });
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(slice);
        Ok(Address(bytes))
    }

    /// Parse from a hex string (with or without `0x`)
    pub fn from_hex(s: &str) -> PrimitiveResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| PrimitiveError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Address whose last eight bytes hold `value` big-endian (`0x..01` for 1)
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }

    /// Take the low 160 bits of a stack word
    pub fn from_word(word: U256) -> Self {
        let mut buf = [0u8; 32];
        word.to_big_endian(&mut buf);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&buf[12..]);
        Address(bytes)
    }

    /// Widen to a stack word
    pub fn to_word(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check for the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Address {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for Address {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Address::from_hex(&s).map_err(de::Error::custom)
        }
    }
}

#[cfg(feature = "rlp")]
mod rlp_impl {
    use super::*;
    use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

    impl Encodable for Address {
        fn rlp_append(&self, s: &mut RlpStream) {
            s.encoder().encode_value(&self.0);
        }
    }

    impl Decodable for Address {
        fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
            rlp.decoder().decode_value(|bytes| {
                Address::from_slice(bytes).map_err(|_| DecoderError::RlpInvalidLength)
            })
        }
    }
}
