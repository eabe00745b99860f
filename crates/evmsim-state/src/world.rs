//! In-memory world state with nested snapshots

use crate::{Account, StateError, StateReader, StateResult, StateWriter, EMPTY_CODE_HASH};
use evmsim_crypto::keccak256;
use evmsim_primitives::{Address, H256};
use rlp::RlpStream;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

/// Handle returned by [`WorldState::snapshot`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotId(usize);

#[derive(Clone, Debug, Default)]
struct Layer {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<Address, BTreeMap<H256, H256>>,
    code: HashMap<H256, Vec<u8>>,
    destroyed: BTreeSet<Address>,
}

/// The simulator's single world state
///
/// Snapshots copy the whole state. Simulated chains are small, so this keeps
/// revert trivially correct for every kind of nested frame.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    current: Layer,
    snapshots: Vec<Layer>,
}

impl WorldState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the current state; pair with [`revert`](Self::revert) or [`commit`](Self::commit)
    pub fn snapshot(&mut self) -> SnapshotId {
        self.snapshots.push(self.current.clone());
        let id = SnapshotId(self.snapshots.len() - 1);
        trace!(depth = id.0, "state snapshot");
        id
    }

    /// Restore the state saved by `id`, discarding it and every later snapshot
    pub fn revert(&mut self, id: SnapshotId) -> StateResult<()> {
        if id.0 >= self.snapshots.len() {
            return Err(StateError::UnknownSnapshot(id.0));
        }
        self.snapshots.truncate(id.0 + 1);
        if let Some(layer) = self.snapshots.pop() {
            self.current = layer;
        }
        trace!(depth = id.0, "state reverted");
        Ok(())
    }

    /// Keep the changes made since `id`
    pub fn commit(&mut self, id: SnapshotId) -> StateResult<()> {
        if id.0 >= self.snapshots.len() {
            return Err(StateError::UnknownSnapshot(id.0));
        }
        self.snapshots.truncate(id.0);
        Ok(())
    }

    /// Number of open snapshots
    pub fn snapshot_depth(&self) -> usize {
        self.snapshots.len()
    }

    /// Schedule an account for deletion at the end of the transaction
    pub fn mark_destroyed(&mut self, address: Address) {
        self.current.destroyed.insert(address);
    }

    /// Whether the account self-destructed in the current transaction
    pub fn is_destroyed(&self, address: &Address) -> bool {
        self.current.destroyed.contains(address)
    }

    /// Delete self-destructed accounts; call once per transaction
    pub fn finalize_tx(&mut self) -> Vec<Address> {
        let destroyed = std::mem::take(&mut self.current.destroyed);
        for address in &destroyed {
            debug!(%address, "removing self-destructed account");
            self.current.accounts.remove(address);
            self.current.storage.remove(address);
        }
        destroyed.into_iter().collect()
    }

    /// Number of accounts
    pub fn account_count(&self) -> usize {
        self.current.accounts.len()
    }

    /// Non-zero storage of an account, ordered by key
    pub fn storage_entries(&self, address: &Address) -> Vec<(H256, H256)> {
        self.current
            .storage
            .get(address)
            .map(|slots| slots.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    /// Commitment to the whole state
    ///
    /// keccak(rlp([[address, nonce, balance, code_hash, storage_hash], ...]))
    /// over accounts sorted by address, where storage_hash commits to the
    /// sorted non-zero slots.
    pub fn state_root(&self) -> H256 {
        let mut stream = RlpStream::new_list(self.current.accounts.len());
        for (address, account) in &self.current.accounts {
            let slots = self.storage_entries(address);
            let mut storage = RlpStream::new_list(slots.len());
            for (key, value) in &slots {
                storage.begin_list(2);
                storage.append(key);
                storage.append(value);
            }
            let storage_hash = keccak256(&storage.out());

            stream.begin_list(5);
            stream.append(address);
            stream.append(&account.nonce);
            stream.append(&account.balance.to_be_bytes().to_vec());
            stream.append(&account.code_hash);
            stream.append(&storage_hash);
        }
        keccak256(&stream.out())
    }
}

impl StateReader for WorldState {
    fn account(&self, address: &Address) -> Option<Account> {
        self.current.accounts.get(address).cloned()
    }

    fn storage(&self, address: &Address, key: &H256) -> H256 {
        self.current
            .storage
            .get(address)
            .and_then(|slots| slots.get(key))
            .copied()
            .unwrap_or(H256::ZERO)
    }

    fn code_by_hash(&self, code_hash: &H256) -> Option<Vec<u8>> {
        if *code_hash == EMPTY_CODE_HASH {
            return Some(Vec::new());
        }
        self.current.code.get(code_hash).cloned()
    }
}

impl StateWriter for WorldState {
    fn set_account(&mut self, address: Address, account: Account) {
        self.current.accounts.insert(address, account);
    }

    fn set_storage(&mut self, address: Address, key: H256, value: H256) {
        let slots = self.current.storage.entry(address).or_default();
        if value.is_zero() {
            slots.remove(&key);
        } else {
            slots.insert(key, value);
        }
        if !self.current.accounts.contains_key(&address) {
            self.current.accounts.insert(address, Account::new());
        }
    }

    fn set_code(&mut self, address: Address, code: Vec<u8>) {
        let code_hash = if code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            let hash = keccak256(&code);
            self.current.code.insert(hash, code);
            hash
        };
        let mut account = self.account(&address).unwrap_or_default();
        account.code_hash = code_hash;
        self.set_account(address, account);
    }
}
