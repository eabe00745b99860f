//! Single-node mining chain
//!
//! Transactions execute against one mutable [`WorldState`] and collect in a
//! pending block until it is mined. Mining either searches a PoW nonce or,
//! after out-of-band state edits, seals the block without one.

use crate::{ChainConfig, ChainError, ChainResult};
use evmsim_crypto::keccak256;
use evmsim_evm::{create_address, gas, BlockEnv, Evm, ExecutionResult, Message, StepHook, TxEnv};
use evmsim_primitives::{Address, H256, U256};
use evmsim_state::{StateReader, StateWriter, WorldState};
use evmsim_types::{
    ordered_root, seal_value, Block, BlockHeader, Receipt, SignedTransaction, TxStatus,
};
use rlp::RlpStream;
use std::time::{SystemTime, UNIX_EPOCH};

/// BLOCKHASH looks back at most this many blocks
const BLOCK_HASH_WINDOW: usize = 256;

/// Block being assembled
#[derive(Debug, Default)]
struct PendingBlock {
    timestamp: u64,
    transactions: Vec<SignedTransaction>,
    receipts: Vec<Receipt>,
    gas_used: u64,
}

/// Chain of mined blocks plus the pending one
pub struct Chain {
    config: ChainConfig,
    state: WorldState,
    blocks: Vec<Block>,
    pending: PendingBlock,
}

impl Chain {
    /// Chain whose genesis state funds `alloc`
    pub fn from_genesis(config: ChainConfig, alloc: &[(Address, u128)]) -> Self {
        let mut state = WorldState::new();
        for (address, balance) in alloc {
            tracing::debug!("Genesis allocation: {} = {}", address, balance);
            state.set_balance(*address, *balance);
        }
        let genesis = Block::genesis(
            state.state_root(),
            config.block_gas_limit,
            U256::from(config.difficulty),
        );
        tracing::info!("Genesis block {}", genesis.hash());

        Self {
            config,
            state,
            blocks: vec![genesis],
            pending: PendingBlock {
                timestamp: now(),
                ..Default::default()
            },
        }
    }

    /// Configuration
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Current world state
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Mutable world state for out-of-band edits; follow with [`mine_block_dirty`](Self::mine_block_dirty)
    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    /// Mined blocks, genesis first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Most recently mined block
    pub fn latest_block(&self) -> &Block {
        // genesis is always present
        &self.blocks[self.blocks.len() - 1]
    }

    /// Number of the block currently being assembled
    pub fn pending_number(&self) -> u64 {
        self.latest_block().number() + 1
    }

    /// Environment seen by transactions of the pending block
    pub fn block_env(&self) -> BlockEnv {
        let start = self.blocks.len().saturating_sub(BLOCK_HASH_WINDOW);
        BlockEnv {
            number: self.pending_number(),
            timestamp: self.pending.timestamp,
            gas_limit: self.config.block_gas_limit,
            coinbase: self.config.coinbase,
            difficulty: U256::from(self.config.difficulty),
            chain_id: self.config.chain_id,
            recent_hashes: self.blocks[start..].iter().map(Block::hash).collect(),
        }
    }

    /// Validate, execute and include a signed transaction
    ///
    /// Returns the pending block including the transaction, its receipt and
    /// the raw execution result.
    pub fn apply_transaction<H: StepHook>(
        &mut self,
        tx: &SignedTransaction,
        hook: H,
    ) -> ChainResult<(Block, Receipt, ExecutionResult)> {
        let sender = tx.recover_sender()?;
        let chain_id = tx.signature.chain_id();
        if chain_id != Some(self.config.chain_id) {
            return Err(ChainError::WrongChainId {
                expected: self.config.chain_id,
                got: chain_id,
            });
        }

        let body = &tx.tx;
        let nonce = self.state.nonce(&sender);
        if body.nonce != nonce {
            return Err(ChainError::NonceMismatch {
                expected: nonce,
                got: body.nonce,
            });
        }

        let intrinsic = gas::intrinsic_gas(&body.data, body.is_create());
        if body.gas_limit < intrinsic {
            return Err(ChainError::IntrinsicGas {
                need: intrinsic,
                limit: body.gas_limit,
            });
        }
        let block_used = self.pending.gas_used.saturating_add(body.gas_limit);
        if block_used > self.config.block_gas_limit {
            return Err(ChainError::BlockGasLimitExceeded {
                used: block_used,
                limit: self.config.block_gas_limit,
            });
        }

        let gas_cost = u128::from(body.gas_limit).saturating_mul(body.gas_price);
        let required = gas_cost.saturating_add(body.value);
        let available = self.state.balance(&sender);
        if available < required {
            return Err(ChainError::InsufficientFunds {
                required,
                available,
            });
        }

        self.state.sub_balance(&sender, gas_cost)?;
        self.state.increment_nonce(&sender)?;

        let gas = body.gas_limit - intrinsic;
        let data = body.data.to_vec();
        let message = match body.to {
            Some(to) => Message::call(sender, to, body.value, data, gas),
            None => Message::create(sender, create_address(&sender, nonce), body.value, data, gas),
        };
        let tx_env = TxEnv {
            origin: sender,
            gas_price: body.gas_price,
        };

        let block_env = self.block_env();
        let result = Evm::with_hook(&mut self.state, block_env, tx_env, hook).execute(message);

        let mut gas_used = intrinsic + result.gas_used;
        gas_used -= result.gas_refund.min(gas_used / 2);
        let unused = u128::from(body.gas_limit - gas_used);
        self.state.add_balance(&sender, unused.saturating_mul(body.gas_price))?;
        self.state
            .add_balance(&self.config.coinbase, u128::from(gas_used).saturating_mul(body.gas_price))?;
        for address in self.state.finalize_tx() {
            tracing::info!("Account {} self-destructed", address);
        }

        self.pending.gas_used += gas_used;
        let status = TxStatus::from(result.is_success());
        let mut receipt = Receipt::new(status, self.pending.gas_used, gas_used, result.logs.clone());
        if let Some(address) = result.created_address.filter(|_| result.is_success()) {
            receipt = receipt.with_contract_address(address);
        }

        match result.error() {
            Some(e) => tracing::warn!("Transaction {} failed: {}", tx.hash(), e),
            None if result.is_aborted() => tracing::warn!("Transaction {} aborted", tx.hash()),
            None if !result.is_success() => tracing::info!("Transaction {} reverted", tx.hash()),
            None => tracing::info!("Transaction {} applied, gas used {}", tx.hash(), gas_used),
        }

        self.pending.transactions.push(tx.clone());
        self.pending.receipts.push(receipt.clone());
        Ok((self.pending_block(0), receipt, result))
    }

    /// Seal the pending block with a PoW nonce
    pub fn mine_block(&mut self) -> Block {
        let unsealed = self.pending_block(0);
        let mining_hash = unsealed.header.mining_hash();
        let target = unsealed.header.pow_target();
        let nonce = (0..=u64::MAX)
            .find(|&nonce| seal_value(&mining_hash, nonce) <= target)
            .unwrap_or_default();
        let block = self.seal(nonce);
        tracing::info!(
            "Mined block {} with nonce {} and hash {}",
            block.number(),
            nonce,
            block.hash()
        );
        block
    }

    /// Seal the pending block without searching a nonce
    ///
    /// Used after state was edited outside any transaction, so the header
    /// is not expected to validate.
    pub fn mine_block_dirty(&mut self) -> Block {
        let block = self.seal(0);
        tracing::debug!("Dirty-mined block {}", block.number());
        block
    }

    fn seal(&mut self, nonce: u64) -> Block {
        let block = self.pending_block(nonce);
        self.blocks.push(block.clone());
        self.pending = PendingBlock {
            timestamp: now().max(block.header.timestamp + 1),
            ..Default::default()
        };
        block
    }

    fn pending_block(&self, nonce: u64) -> Block {
        let tx_hashes: Vec<H256> = self.pending.transactions.iter().map(SignedTransaction::hash).collect();
        let receipt_hashes: Vec<H256> = self.pending.receipts.iter().map(receipt_hash).collect();
        let header = BlockHeader {
            parent_hash: self.latest_block().hash(),
            beneficiary: self.config.coinbase,
            state_root: self.state.state_root(),
            transactions_root: ordered_root(&tx_hashes),
            receipts_root: ordered_root(&receipt_hashes),
            difficulty: U256::from(self.config.difficulty),
            number: self.pending_number(),
            gas_limit: self.config.block_gas_limit,
            gas_used: self.pending.gas_used,
            timestamp: self.pending.timestamp,
            nonce,
        };
        Block {
            header,
            transactions: self.pending.transactions.clone(),
            receipts: self.pending.receipts.clone(),
        }
    }
}

fn receipt_hash(receipt: &Receipt) -> H256 {
    let mut stream = RlpStream::new_list(4);
    stream.append(&u8::from(receipt.is_success()));
    stream.append(&receipt.cumulative_gas_used);
    stream.append(&receipt.gas_used);
    stream.begin_list(receipt.logs.len());
    for log in &receipt.logs {
        stream.begin_list(3);
        stream.append(&log.address);
        stream.append_list(&log.topics);
        stream.append(&log.data.to_vec());
    }
    keccak256(&stream.out())
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
