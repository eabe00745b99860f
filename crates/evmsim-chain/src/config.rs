//! Chain configuration

use evmsim_crypto::{private_key_from_hex, PrivateKey};
use evmsim_primitives::{Address, ETHER};
use serde::{Deserialize, Serialize};

use crate::ChainResult;

/// Well-known development key funding every simulated transaction
pub const DEFAULT_MASTER_KEY: &str =
    "0x45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8";

/// Chain configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain ID used for EIP-155 signatures
    pub chain_id: u64,
    /// Hex private key of the master account
    pub master_private_key: String,
    /// Genesis balance of the master account in wei
    #[serde(with = "wei")]
    pub master_balance: u128,
    /// Gas price of every transaction
    #[serde(with = "wei")]
    pub gas_price: u128,
    /// Gas limit of every transaction
    pub tx_gas_limit: u64,
    /// Block gas limit
    pub block_gas_limit: u64,
    /// PoW difficulty
    pub difficulty: u64,
    /// Miner address receiving fees
    pub coinbase: Address,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            master_private_key: DEFAULT_MASTER_KEY.to_string(),
            master_balance: 100 * ETHER,
            gas_price: 1,
            tx_gas_limit: 1_000_000_000,
            block_gas_limit: 1_000_000_000_000_000_000,
            difficulty: 1,
            coinbase: Address::ZERO,
        }
    }
}

impl ChainConfig {
    /// Decode the master key
    pub fn master_key(&self) -> ChainResult<PrivateKey> {
        Ok(private_key_from_hex(&self.master_private_key)?)
    }
}

/// Wei amounts as decimal strings; TOML integers stop at i64
mod wei {
    use evmsim_primitives::parse_u128;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Int(value) => Ok(u128::from(value)),
            Repr::Text(text) => parse_u128(&text).map_err(de::Error::custom),
        }
    }
}
