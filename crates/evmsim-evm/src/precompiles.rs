//! Precompiled contracts at 0x01, 0x02 and 0x04
//!
//! RIPEMD-160 (0x03) and the later arithmetic precompiles are not provided;
//! calls to those addresses behave like calls to empty accounts.

use crate::error::{EvmError, EvmResult};
use evmsim_crypto::{recover_address, Signature};
use evmsim_primitives::{Address, H256};
use sha2::{Digest, Sha256};

/// ecrecover gas
pub const ECRECOVER_GAS: u64 = 3000;
/// sha256 base gas
pub const SHA256_BASE: u64 = 60;
/// sha256 gas per word
pub const SHA256_WORD: u64 = 12;
/// identity base gas
pub const IDENTITY_BASE: u64 = 15;
/// identity gas per word
pub const IDENTITY_WORD: u64 = 3;

/// Whether `address` hosts a precompile
pub fn is_precompile(address: &Address) -> bool {
    matches!(precompile_id(address), Some(1 | 2 | 4))
}

fn precompile_id(address: &Address) -> Option<u8> {
    let bytes = address.as_bytes();
    if bytes[..19].iter().all(|&b| b == 0) {
        Some(bytes[19])
    } else {
        None
    }
}

/// Run the precompile at `address`; returns output and gas used
pub fn run(address: &Address, input: &[u8], gas_limit: u64) -> Option<EvmResult<(Vec<u8>, u64)>> {
    let words = input.len().div_ceil(32) as u64;
    let (cost, output) = match precompile_id(address)? {
        1 => (ECRECOVER_GAS, ecrecover(input)),
        2 => (SHA256_BASE + SHA256_WORD * words, Sha256::digest(input).to_vec()),
        4 => (IDENTITY_BASE + IDENTITY_WORD * words, input.to_vec()),
        _ => return None,
    };
    if cost > gas_limit {
        return Some(Err(EvmError::OutOfGas));
    }
    Some(Ok((output, cost)))
}

fn ecrecover(input: &[u8]) -> Vec<u8> {
    let mut padded = [0u8; 128];
    let len = input.len().min(128);
    padded[..len].copy_from_slice(&input[..len]);

    // v is a full word that must be exactly 27 or 28
    if padded[32..63].iter().any(|&b| b != 0) || !matches!(padded[63], 27 | 28) {
        return Vec::new();
    }

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&padded[..32]);
    let mut r = [0u8; 32];
    r.copy_from_slice(&padded[64..96]);
    let mut s = [0u8; 32];
    s.copy_from_slice(&padded[96..128]);
    let signature = Signature { r, s, v: padded[63] };

    match recover_address(&H256::from_bytes(hash), &signature) {
        Ok(address) => {
            let mut out = vec![0u8; 32];
            out[12..].copy_from_slice(address.as_bytes());
            out
        }
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmsim_crypto::{address_of, keccak256, private_key_from_hex, sign};

    #[test]
    fn test_precompile_addresses() {
        assert!(is_precompile(&Address::from_low_u64(1)));
        assert!(is_precompile(&Address::from_low_u64(2)));
        assert!(!is_precompile(&Address::from_low_u64(3)));
        assert!(is_precompile(&Address::from_low_u64(4)));
        assert!(!is_precompile(&Address::from_low_u64(0x104)));
        assert!(run(&Address::from_low_u64(9), &[], 1000).is_none());
    }

    #[test]
    fn test_identity() {
        let (out, gas) = run(&Address::from_low_u64(4), &[1, 2, 3], 1000).unwrap().unwrap();
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(gas, 18);
    }

    #[test]
    fn test_sha256() {
        let (out, gas) = run(&Address::from_low_u64(2), b"", 1000).unwrap().unwrap();
        assert_eq!(
            hex::encode(out),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(gas, 60);
    }

    #[test]
    fn test_out_of_gas() {
        let result = run(&Address::from_low_u64(1), &[], 10).unwrap();
        assert_eq!(result, Err(EvmError::OutOfGas));
    }

    #[test]
    fn test_ecrecover() {
        let key = private_key_from_hex(
            "0x45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8",
        )
        .unwrap();
        let hash = keccak256(b"message");
        let signature = sign(&hash, &key).unwrap();

        let mut input = vec![0u8; 128];
        input[..32].copy_from_slice(hash.as_bytes());
        input[63] = signature.v;
        input[64..96].copy_from_slice(&signature.r);
        input[96..].copy_from_slice(&signature.s);

        let (out, _) = run(&Address::from_low_u64(1), &input, 5000).unwrap().unwrap();
        assert_eq!(&out[12..], address_of(&key).as_bytes());

        input[63] = 29;
        let (out, _) = run(&Address::from_low_u64(1), &input, 5000).unwrap().unwrap();
        assert!(out.is_empty());
    }
}
