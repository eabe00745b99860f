//! Handler facade
//!
//! [`EvmHandler`] is the single entry point a front end talks to. Every
//! state-changing call is a signed transaction from the master account,
//! followed by mining a block. Direct state edits are followed by a dirty
//! mine so the next transaction starts on a fresh pending block.

use std::collections::BTreeSet;

use bytes::Bytes;
use evmsim_crypto::{address_of, keccak256, PrivateKey};
use evmsim_evm::{create_address, ExecutionResult, NoHook, StepHook};
use evmsim_primitives::{Address, H256, U256};
use evmsim_state::{StateReader, StateWriter};
use evmsim_types::{Block, LegacyTx, Receipt};

use crate::abi::{encode_call, AbiArg};
use crate::{Chain, ChainConfig, ChainResult};

/// Facade over the simulated chain
pub struct EvmHandler {
    chain: Chain,
    master_key: PrivateKey,
    master_address: Address,
    used_addresses: BTreeSet<Address>,
    seed: H256,
    last_result: Option<ExecutionResult>,
}

impl EvmHandler {
    /// Start a chain whose genesis funds the master account
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        let master_key = config.master_key()?;
        let master_address = address_of(&master_key);
        let chain = Chain::from_genesis(config.clone(), &[(master_address, config.master_balance)]);
        tracing::info!("Master account {}", master_address);

        Ok(Self {
            chain,
            master_key,
            master_address,
            used_addresses: BTreeSet::from([master_address]),
            seed: keccak256(&rand::random::<[u8; 32]>()),
            last_result: None,
        })
    }

    /// Underlying chain
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Account signing every transaction
    pub fn master_address(&self) -> Address {
        self.master_address
    }

    /// Master plus every address sent value to, created or given code
    pub fn used_addresses(&self) -> &BTreeSet<Address> {
        &self.used_addresses
    }

    /// Gas price of every transaction
    pub fn gas_price(&self) -> u128 {
        self.chain.config().gas_price
    }

    /// Gas limit of every transaction
    pub fn gas_limit(&self) -> u64 {
        self.chain.config().tx_gas_limit
    }

    /// Transfer `value` wei from the master account; never observed
    pub fn send_wei(&mut self, to: Address, value: u128) -> ChainResult<Address> {
        tracing::info!("Sending {} wei to {}", value, to);
        self.used_addresses.insert(to);
        let (_, receipt, _) = self.transact(Some(to), value, Vec::new(), NoHook)?;
        tracing::debug!(gas_used = receipt.gas_used, "transfer mined");
        Ok(to)
    }

    /// Deploy `init_code`; `None` when the constructor reverted or faulted
    pub fn create_contract(
        &mut self,
        init_code: &[u8],
        value: u128,
        hook: &mut impl StepHook,
    ) -> ChainResult<Option<Address>> {
        let nonce = self.chain.state().nonce(&self.master_address);
        let (_, _, result) = self.transact(None, value, init_code.to_vec(), hook)?;
        if !result.is_success() {
            tracing::warn!("Contract creation failed");
            return Ok(None);
        }
        let address = create_address(&self.master_address, nonce);
        tracing::info!("Created contract at {}", address);
        self.used_addresses.insert(address);
        Ok(Some(address))
    }

    /// Call `signature` on `to` with ABI encoded `args`
    ///
    /// The signature `rawdata(any)` sends the first argument's hex value as
    /// call data unchanged.
    pub fn call_contract_function(
        &mut self,
        to: Address,
        signature: &str,
        args: &[AbiArg],
        value: u128,
        hook: &mut impl StepHook,
    ) -> ChainResult<(Block, Receipt, ExecutionResult)> {
        tracing::info!("Calling {} at {} with {} arguments", signature, to, args.len());
        let data = encode_call(signature, args)?;
        self.transact(Some(to), value, data, hook)
    }

    /// Execution outcome of the most recent transaction
    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }

    /// Balance in wei
    pub fn get_balance(&self, address: &Address) -> u128 {
        self.chain.state().balance(address)
    }

    /// Deployed code; empty for plain accounts
    pub fn get_code(&self, address: &Address) -> Vec<u8> {
        self.chain.state().code(address)
    }

    /// Storage word at `slot`
    pub fn get_storage_at(&self, address: &Address, slot: U256) -> U256 {
        self.chain.state().storage(address, &H256::from_word(slot)).to_word()
    }

    /// Number of the block the next transaction lands in
    pub fn get_block_number(&self) -> u64 {
        self.chain.pending_number()
    }

    /// Overwrite a balance
    pub fn set_balance(&mut self, address: Address, balance: u128) {
        self.chain.state_mut().set_balance(address, balance);
        self.chain.mine_block_dirty();
    }

    /// Install runtime code, at a fresh random address when `address` is `None`
    pub fn set_code(&mut self, code: Vec<u8>, address: Option<Address>) -> Address {
        let address = address.unwrap_or_else(|| self.random_address());
        self.used_addresses.insert(address);
        self.chain.state_mut().set_code(address, code);
        self.chain.mine_block_dirty();
        address
    }

    /// Overwrite one storage word
    pub fn set_storage(&mut self, address: Address, slot: U256, value: U256) {
        self.chain
            .state_mut()
            .set_storage(address, H256::from_word(slot), H256::from_word(value));
        self.chain.mine_block_dirty();
    }

    /// Next address of the seed chain
    fn random_address(&mut self) -> Address {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&self.seed.as_bytes()[..20]);
        self.seed = keccak256(self.seed.as_bytes());
        Address::from(bytes)
    }

    fn transact<H: StepHook>(
        &mut self,
        to: Option<Address>,
        value: u128,
        data: Vec<u8>,
        hook: H,
    ) -> ChainResult<(Block, Receipt, ExecutionResult)> {
        let config = self.chain.config();
        let tx = LegacyTx {
            nonce: self.chain.state().nonce(&self.master_address),
            gas_price: config.gas_price,
            gas_limit: config.tx_gas_limit,
            to,
            value,
            data: Bytes::from(data),
        }
        .sign(config.chain_id, &self.master_key)?;

        let (_, receipt, result) = self.chain.apply_transaction(&tx, hook)?;
        let block = self.chain.mine_block();
        self.last_result = Some(result.clone());
        Ok((block, receipt, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmsim_primitives::ETHER;

    fn handler() -> EvmHandler {
        EvmHandler::new(ChainConfig::default()).unwrap()
    }

    #[test]
    fn test_master_funded() {
        let handler = handler();
        assert_eq!(handler.get_balance(&handler.master_address()), 100 * ETHER);
        assert!(handler.used_addresses().contains(&handler.master_address()));
    }

    #[test]
    fn test_random_addresses_differ() {
        let mut handler = handler();
        let a = handler.random_address();
        let b = handler.random_address();
        assert_ne!(a, b);
    }

    #[test]
    fn test_set_code_without_address() {
        let mut handler = handler();
        let address = handler.set_code(vec![0x00], None);
        assert_eq!(handler.get_code(&address), vec![0x00]);
        assert_eq!(handler.get_block_number(), 2);
    }
}
