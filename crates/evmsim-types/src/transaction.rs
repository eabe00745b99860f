//! Legacy transactions with EIP-155 signatures

use bytes::Bytes;
use evmsim_crypto::{keccak256, recover_address, sign, CryptoError, PrivateKey, Signature};
use evmsim_primitives::{Address, H256, U256};
use rlp::RlpStream;

/// Unsigned legacy transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTx {
    /// Sender nonce
    pub nonce: u64,
    /// Gas price in wei
    pub gas_price: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation
    pub to: Option<Address>,
    /// Value in wei
    pub value: u128,
    /// Call data or init code
    pub data: Bytes,
}

impl Default for LegacyTx {
    fn default() -> Self {
        Self {
            nonce: 0,
            gas_price: 0,
            gas_limit: 21000,
            to: None,
            value: 0,
            data: Bytes::new(),
        }
    }
}

impl LegacyTx {
    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&U256::from(self.gas_price));
        stream.append(&self.gas_limit);
        match &self.to {
            Some(to) => {
                stream.append(to);
            }
            None => {
                stream.append_empty_data();
            }
        }
        stream.append(&U256::from(self.value));
        stream.append(&self.data.to_vec());
    }

    /// EIP-155 signing hash: keccak(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(&stream.out())
    }

    /// Sign with `key` for `chain_id`
    pub fn sign(self, chain_id: u64, key: &PrivateKey) -> Result<SignedTransaction, CryptoError> {
        let signature = sign(&self.signing_hash(chain_id), key)?;
        let v = u64::from(signature.recovery_id()) + 35 + 2 * chain_id;
        Ok(SignedTransaction {
            tx: self,
            signature: TxSignature {
                v,
                r: H256::from_bytes(signature.r),
                s: H256::from_bytes(signature.s),
            },
        })
    }

    /// Whether this creates a contract
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// Signature components as they appear on the wire
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSignature {
    /// `recovery_id + 35 + 2 * chain_id`
    pub v: u64,
    /// R component
    pub r: H256,
    /// S component
    pub s: H256,
}

impl TxSignature {
    /// Chain id encoded in `v`, if EIP-155 protected
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    fn recovery_id(&self) -> Result<u8, CryptoError> {
        let id = match self.v {
            27 | 28 => self.v - 27,
            v if v >= 35 => (v - 35) % 2,
            v => return Err(CryptoError::InvalidRecoveryId(v.min(255) as u8)),
        };
        Ok(id as u8)
    }
}

/// Signed legacy transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Transaction body
    pub tx: LegacyTx,
    /// Signature
    pub signature: TxSignature,
}

impl SignedTransaction {
    /// Full RLP encoding
    pub fn rlp_bytes(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.tx.append_body(&mut stream);
        stream.append(&self.signature.v);
        stream.append(&self.signature.r.to_word());
        stream.append(&self.signature.s.to_word());
        stream.out().to_vec()
    }

    /// Transaction hash
    pub fn hash(&self) -> H256 {
        keccak256(&self.rlp_bytes())
    }

    /// Recover the sender from the signature
    pub fn recover_sender(&self) -> Result<Address, CryptoError> {
        let chain_id = self.signature.chain_id().unwrap_or_default();
        let hash = self.tx.signing_hash(chain_id);
        let signature = Signature {
            r: *self.signature.r.as_bytes(),
            s: *self.signature.s.as_bytes(),
            v: self.signature.recovery_id()? + 27,
        };
        recover_address(&hash, &signature)
    }
}
