//! Read and write access to world state

use crate::{Account, StateError, StateResult, EMPTY_CODE_HASH};
use evmsim_primitives::{Address, H256};

/// Read access to state
pub trait StateReader {
    /// Account by address
    fn account(&self, address: &Address) -> Option<Account>;

    /// Storage slot value, zero when unset
    fn storage(&self, address: &Address, key: &H256) -> H256;

    /// Code by hash
    fn code_by_hash(&self, code_hash: &H256) -> Option<Vec<u8>>;

    /// Whether the account exists
    fn exists(&self, address: &Address) -> bool {
        self.account(address).is_some()
    }

    /// Account nonce
    fn nonce(&self, address: &Address) -> u64 {
        self.account(address).map(|a| a.nonce).unwrap_or(0)
    }

    /// Account balance
    fn balance(&self, address: &Address) -> u128 {
        self.account(address).map(|a| a.balance).unwrap_or(0)
    }

    /// Account code hash
    fn code_hash(&self, address: &Address) -> H256 {
        self.account(address)
            .map(|a| a.code_hash)
            .unwrap_or(EMPTY_CODE_HASH)
    }

    /// Account code, empty for externally owned accounts
    fn code(&self, address: &Address) -> Vec<u8> {
        let hash = self.code_hash(address);
        if hash == EMPTY_CODE_HASH {
            return Vec::new();
        }
        self.code_by_hash(&hash).unwrap_or_default()
    }
}

/// Write access to state
pub trait StateWriter: StateReader {
    /// Replace an account
    fn set_account(&mut self, address: Address, account: Account);

    /// Write a storage slot; zero deletes it
    fn set_storage(&mut self, address: Address, key: H256, value: H256);

    /// Attach code to an account
    fn set_code(&mut self, address: Address, code: Vec<u8>);

    /// Overwrite the balance
    fn set_balance(&mut self, address: Address, balance: u128) {
        let mut account = self.account(&address).unwrap_or_default();
        account.balance = balance;
        self.set_account(address, account);
    }

    /// Increment nonce, returning the new value
    fn increment_nonce(&mut self, address: &Address) -> StateResult<u64> {
        let mut account = self.account(address).unwrap_or_default();
        account.nonce = account
            .nonce
            .checked_add(1)
            .ok_or(StateError::NonceOverflow(*address))?;
        let nonce = account.nonce;
        self.set_account(*address, account);
        Ok(nonce)
    }

    /// Credit an account
    fn add_balance(&mut self, address: &Address, amount: u128) -> StateResult<()> {
        let mut account = self.account(address).unwrap_or_default();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow(*address))?;
        self.set_account(*address, account);
        Ok(())
    }

    /// Debit an account
    fn sub_balance(&mut self, address: &Address, amount: u128) -> StateResult<()> {
        let mut account = self.account(address).unwrap_or_default();
        if account.balance < amount {
            return Err(StateError::InsufficientBalance {
                address: *address,
                needed: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        self.set_account(*address, account);
        Ok(())
    }

    /// Move value between accounts, creating the recipient if needed
    fn transfer(&mut self, from: &Address, to: &Address, value: u128) -> StateResult<()> {
        if value == 0 {
            if !self.exists(to) {
                self.set_account(*to, Account::new());
            }
            return Ok(());
        }
        self.sub_balance(from, value)?;
        self.add_balance(to, value)
    }
}
