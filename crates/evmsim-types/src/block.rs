//! Blocks of the simulated chain

use crate::{Receipt, SignedTransaction};
use evmsim_crypto::keccak256;
use evmsim_primitives::{Address, H256, U256};
use rlp::RlpStream;

/// Root of an empty list: keccak256 of the empty RLP list
pub const EMPTY_ROOT: H256 = H256::from_bytes([
    0x1d, 0xcc, 0x4d, 0xe8, 0xde, 0xc7, 0x5d, 0x7a, 0xab, 0x85, 0xb5, 0x67, 0xb6, 0xcc, 0xd4, 0x1a,
    0xd3, 0x12, 0x45, 0x1b, 0x94, 0x8a, 0x74, 0x13, 0xf0, 0xa1, 0x42, 0xfd, 0x40, 0xd4, 0x93, 0x47,
]);

/// Commitment to an ordered list of hashes: keccak(rlp([h0, h1, ...]))
pub fn ordered_root(hashes: &[H256]) -> H256 {
    let mut stream = RlpStream::new_list(hashes.len());
    for hash in hashes {
        stream.append(hash);
    }
    keccak256(&stream.out())
}

/// Block header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Parent block hash
    pub parent_hash: H256,
    /// Miner
    pub beneficiary: Address,
    /// World-state commitment after the block
    pub state_root: H256,
    /// Commitment to the transactions
    pub transactions_root: H256,
    /// Commitment to the receipts
    pub receipts_root: H256,
    /// PoW difficulty
    pub difficulty: U256,
    /// Height
    pub number: u64,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas used by all transactions
    pub gas_used: u64,
    /// Unix seconds
    pub timestamp: u64,
    /// PoW nonce
    pub nonce: u64,
}

impl BlockHeader {
    fn append_unsealed(&self, stream: &mut RlpStream) {
        stream.append(&self.parent_hash);
        stream.append(&self.beneficiary);
        stream.append(&self.state_root);
        stream.append(&self.transactions_root);
        stream.append(&self.receipts_root);
        stream.append(&self.difficulty);
        stream.append(&self.number);
        stream.append(&self.gas_limit);
        stream.append(&self.gas_used);
        stream.append(&self.timestamp);
    }

    /// Hash of every field except the nonce; input to the PoW search
    pub fn mining_hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(10);
        self.append_unsealed(&mut stream);
        keccak256(&stream.out())
    }

    /// Block hash
    pub fn hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(11);
        self.append_unsealed(&mut stream);
        stream.append(&self.nonce);
        keccak256(&stream.out())
    }

    /// PoW target for this header's difficulty: 2^256 / difficulty (saturating)
    pub fn pow_target(&self) -> U256 {
        if self.difficulty <= U256::one() {
            U256::MAX
        } else {
            U256::MAX / self.difficulty
        }
    }

    /// Whether the nonce satisfies the PoW target
    pub fn check_pow(&self) -> bool {
        seal_value(&self.mining_hash(), self.nonce) <= self.pow_target()
    }
}

/// keccak(mining_hash || nonce) interpreted as a big-endian word
pub fn seal_value(mining_hash: &H256, nonce: u64) -> U256 {
    let mut input = [0u8; 40];
    input[..32].copy_from_slice(mining_hash.as_bytes());
    input[32..].copy_from_slice(&nonce.to_be_bytes());
    keccak256(&input).to_word()
}

/// Complete block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Header
    pub header: BlockHeader,
    /// Transactions, in execution order
    pub transactions: Vec<SignedTransaction>,
    /// Receipts, one per transaction
    pub receipts: Vec<Receipt>,
}

impl Block {
    /// Genesis block with the given state root
    pub fn genesis(state_root: H256, gas_limit: u64, difficulty: U256) -> Self {
        Self {
            header: BlockHeader {
                parent_hash: H256::ZERO,
                beneficiary: Address::ZERO,
                state_root,
                transactions_root: EMPTY_ROOT,
                receipts_root: EMPTY_ROOT,
                difficulty,
                number: 0,
                gas_limit,
                gas_used: 0,
                timestamp: 0,
                nonce: 0,
            },
            transactions: Vec::new(),
            receipts: Vec::new(),
        }
    }

    /// Block hash
    pub fn hash(&self) -> H256 {
        self.header.hash()
    }

    /// Block number
    pub fn number(&self) -> u64 {
        self.header.number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root() {
        assert_eq!(ordered_root(&[]), EMPTY_ROOT);
    }

    #[test]
    fn test_ordered_root_is_order_sensitive() {
        let a = H256::from_bytes([1; 32]);
        let b = H256::from_bytes([2; 32]);
        assert_ne!(ordered_root(&[a, b]), ordered_root(&[b, a]));
    }

    #[test]
    fn test_nonce_changes_hash_not_mining_hash() {
        let mut header = Block::genesis(H256::ZERO, 1_000_000, U256::one()).header;
        let mining = header.mining_hash();
        let hash = header.hash();
        header.nonce = 42;
        assert_eq!(header.mining_hash(), mining);
        assert_ne!(header.hash(), hash);
    }

    #[test]
    fn test_difficulty_one_accepts_any_nonce() {
        let header = Block::genesis(H256::ZERO, 1_000_000, U256::one()).header;
        assert_eq!(header.pow_target(), U256::MAX);
        assert!(header.check_pow());
    }

    #[test]
    fn test_genesis_number() {
        let genesis = Block::genesis(H256::ZERO, 10, U256::one());
        assert_eq!(genesis.number(), 0);
        assert!(genesis.transactions.is_empty());
    }
}
