//! Storage slot index
//!
//! Assigns every storage slot a stable display position per account, in
//! first-seen order. The chain has no notion of "slots seen so far", so the
//! index is built here from SLOAD, SSTORE and direct storage edits.

use crate::accessors::slot_key;
use evmsim_primitives::{Address, U256};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct AccountSlots {
    positions: HashMap<String, usize>,
    order: Vec<String>,
}

/// Per-account mapping from normalized slot key to display index
#[derive(Debug, Default)]
pub struct SlotIndex {
    accounts: BTreeMap<Address, AccountSlots>,
}

impl SlotIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `slot`, assigning the next one on first sight
    ///
    /// Returns the index and whether it was newly assigned.
    pub fn register(&mut self, address: Address, slot: &U256) -> (usize, bool) {
        let key = slot_key(slot);
        let slots = self.accounts.entry(address).or_default();
        if let Some(&index) = slots.positions.get(&key) {
            return (index, false);
        }
        let index = slots.order.len();
        tracing::trace!("Registered slot {} of {} at index {}", key, address, index);
        slots.positions.insert(key.clone(), index);
        slots.order.push(key);
        (index, true)
    }

    /// Index of an already registered slot
    pub fn index_of(&self, address: &Address, slot: &U256) -> Option<usize> {
        self.accounts
            .get(address)
            .and_then(|slots| slots.positions.get(&slot_key(slot)).copied())
    }

    /// Index of a slot that must have been registered
    ///
    /// # Panics
    ///
    /// Panics when the slot is unknown; callers register before reading.
    pub fn expect_index(&self, address: &Address, slot: &U256) -> usize {
        match self.index_of(address, slot) {
            Some(index) => index,
            None => panic!("slot {} of {} read before registration", slot_key(slot), address),
        }
    }

    /// Slot keys of `address` in display order
    pub fn slots(&self, address: &Address) -> &[String] {
        self.accounts
            .get(address)
            .map(|slots| slots.order.as_slice())
            .unwrap_or_default()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut index = SlotIndex::new();
        let address = Address::from_low_u64(1);
        assert_eq!(index.register(address, &U256::from(7)), (0, true));
        assert_eq!(index.register(address, &U256::from(3)), (1, true));
        assert_eq!(index.register(address, &U256::from(7)), (0, false));
        assert_eq!(index.slots(&address), &["0x07".to_string(), "0x03".to_string()]);
    }

    #[test]
    fn test_indices_are_per_account() {
        let mut index = SlotIndex::new();
        let a = Address::from_low_u64(1);
        let b = Address::from_low_u64(2);
        index.register(a, &U256::from(5));
        assert_eq!(index.register(b, &U256::from(9)), (0, true));
        assert_eq!(index.index_of(&a, &U256::from(9)), None);
        assert_eq!(index.expect_index(&b, &U256::from(9)), 0);
        assert_eq!(index.slots(&a), &["0x05".to_string()]);
    }

    #[test]
    #[should_panic(expected = "read before registration")]
    fn test_unregistered_read_panics() {
        SlotIndex::new().expect_index(&Address::ZERO, &U256::one());
    }
}
