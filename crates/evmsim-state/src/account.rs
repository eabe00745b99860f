//! Account record

use evmsim_primitives::H256;

/// keccak256 of empty code
pub const EMPTY_CODE_HASH: H256 = H256::from_bytes([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Account data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Nonce
    pub nonce: u64,
    /// Balance in wei
    pub balance: u128,
    /// keccak256 of the code, [`EMPTY_CODE_HASH`] for externally owned accounts
    pub code_hash: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

impl Account {
    /// Empty account
    pub fn new() -> Self {
        Self {
            nonce: 0,
            balance: 0,
            code_hash: EMPTY_CODE_HASH,
        }
    }

    /// Account holding `balance`
    pub fn with_balance(balance: u128) -> Self {
        Self {
            balance,
            ..Self::new()
        }
    }

    /// EIP-161 emptiness
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance == 0 && !self.has_code()
    }

    /// Whether code is attached
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }
}
