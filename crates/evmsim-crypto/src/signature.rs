//! secp256k1 signatures with Ethereum-style recovery ids

use crate::{keccak256, CryptoError};
use evmsim_primitives::{Address, H256};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};

/// Public key type
pub type PublicKey = VerifyingKey;

/// Private key type
pub type PrivateKey = SigningKey;

/// Recoverable ECDSA signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r component
    pub r: [u8; 32],
    /// s component, always in the lower half of the curve order
    pub s: [u8; 32],
    /// recovery id as 27 or 28
    pub v: u8,
}

impl Signature {
    /// Raw recovery id (0 or 1)
    pub fn recovery_id(&self) -> u8 {
        if self.v >= 27 {
            self.v - 27
        } else {
            self.v
        }
    }

    /// `r || s || v`
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }
}

/// Sign a 32-byte message hash, normalising to low-s
pub fn sign(message_hash: &H256, private_key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (mut signature, mut recovery_id) = private_key
        .sign_prehash_recoverable(message_hash.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    Ok(Signature {
        r: signature.r().to_bytes().into(),
        s: signature.s().to_bytes().into(),
        v: recovery_id.to_byte() + 27,
    })
}

/// Recover the signer's public key
pub fn recover_public_key(
    message_hash: &H256,
    signature: &Signature,
) -> Result<PublicKey, CryptoError> {
    let r: k256::FieldBytes = signature.r.into();
    let s: k256::FieldBytes = signature.s.into();
    let k256_sig = K256Signature::from_scalars(r, s)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    let recovery_id = RecoveryId::from_byte(signature.recovery_id())
        .ok_or(CryptoError::InvalidRecoveryId(signature.v))?;

    VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &k256_sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

/// Recover the signer's address
pub fn recover_address(message_hash: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    recover_public_key(message_hash, signature).map(|key| public_key_to_address(&key))
}

/// Derive the address of a public key: last 20 bytes of keccak(x || y)
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

/// Address controlled by a private key
pub fn address_of(private_key: &PrivateKey) -> Address {
    public_key_to_address(private_key.verifying_key())
}

/// Parse a 32-byte hex private key (with or without `0x`)
pub fn private_key_from_hex(s: &str) -> Result<PrivateKey, CryptoError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(CryptoError::InvalidPrivateKey(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
}
