//! Contract-scoped state used during transaction execution.
//!
//! Each system contract owns a key space addressed by its contract address.
//! The execution layer supplies the hash of the transaction being executed so
//! that records can point back at the transaction that wrote them.

use std::collections::{BTreeMap, HashMap};

use sentinel_types::{Address, TxHash};

/// State access for the transaction currently being executed.
pub trait StateDb {
    /// Value stored under `key` for `contract`, `None` when absent.
    fn get_state(&self, contract: &Address, key: &[u8]) -> Option<Vec<u8>>;

    /// Store `value` under `key`. An empty value clears the slot.
    fn set_state(&mut self, contract: &Address, key: &[u8], value: Vec<u8>);

    /// Hash of the transaction currently executing.
    fn tx_hash(&self) -> TxHash;
}

/// HashMap-backed [`StateDb`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStateDb {
    slots: HashMap<Address, BTreeMap<Vec<u8>, Vec<u8>>>,
    tx_hash: TxHash,
}

impl MemoryStateDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to the next transaction.
    pub fn set_tx_hash(&mut self, tx_hash: TxHash) {
        self.tx_hash = tx_hash;
    }

    /// Number of slots set for `contract`.
    pub fn slot_count(&self, contract: &Address) -> usize {
        self.slots.get(contract).map(|s| s.len()).unwrap_or(0)
    }
}

impl StateDb for MemoryStateDb {
    fn get_state(&self, contract: &Address, key: &[u8]) -> Option<Vec<u8>> {
        self.slots
            .get(contract)
            .and_then(|slots| slots.get(key))
            .cloned()
    }

    fn set_state(&mut self, contract: &Address, key: &[u8], value: Vec<u8>) {
        let slots = self.slots.entry(*contract).or_default();
        if value.is_empty() {
            slots.remove(key);
        } else {
            slots.insert(key.to_vec(), value);
        }
    }

    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contracts_do_not_share_slots() {
        let mut db = MemoryStateDb::new();
        let a = Address([1; 20]);
        let b = Address([2; 20]);
        db.set_state(&a, b"k", vec![1]);
        assert_eq!(db.get_state(&a, b"k"), Some(vec![1]));
        assert_eq!(db.get_state(&b, b"k"), None);
    }

    #[test]
    fn empty_value_clears_slot() {
        let mut db = MemoryStateDb::new();
        let a = Address([1; 20]);
        db.set_state(&a, b"k", vec![1]);
        db.set_state(&a, b"k", Vec::new());
        assert_eq!(db.get_state(&a, b"k"), None);
        assert_eq!(db.slot_count(&a), 0);
    }
}
