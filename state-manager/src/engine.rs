use crate::error::{Error, Result};
use crate::store::StateStore;
use crate::types::StateRoot;
use parking_lot::{Mutex, RwLock};
use sequencer_types::Clock;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Append-only log of L2 state roots, keyed and iterated by block number.
///
/// Ordering is delegated to a `BTreeMap<u64, StateRoot>`: insertion order is
/// irrelevant, iteration is always ascending by block number, and `latest()`
/// is simply the last entry — no separate bookkeeping of "highest seen" is
/// needed.
pub struct StateManager {
    store: Mutex<Box<dyn StateStore>>,
    roots: RwLock<BTreeMap<u64, StateRoot>>,
    clock: Arc<dyn Clock>,
}

impl StateManager {
    pub fn new(store: Box<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store: Mutex::new(store), roots: RwLock::new(BTreeMap::new()), clock }
    }

    /// Loads existing entries from the backing store, sorted by block
    /// number. `root_identity` names which L2 this log belongs to; it is
    /// not used to select the backing file (the store is already bound to
    /// one at construction) but is carried through to the startup log line.
    pub fn initialize(&self, root_identity: &str) -> Result<()> {
        let loaded = self.store.lock().load_all()?;
        let mut roots = self.roots.write();
        roots.clear();
        for entry in loaded {
            roots.insert(entry.block_number, entry);
        }
        tracing::info!(root_identity, entries = roots.len(), "state manager initialized");
        Ok(())
    }

    /// Appends a new root. Rejects a block number already present; the
    /// entry is durable in the backing store before this returns.
    pub fn submit_state_root(&self, root: [u8; 32], block_number: u64) -> Result<StateRoot> {
        let mut roots = self.roots.write();
        if roots.contains_key(&block_number) {
            return Err(Error::DuplicateBlockNumber(block_number));
        }
        let entry = StateRoot { root, block_number, timestamp: self.clock.now_ms() };
        self.store.lock().append(&entry)?;
        roots.insert(block_number, entry);
        Ok(entry)
    }

    pub fn latest(&self) -> Result<StateRoot> {
        self.roots.read().values().next_back().copied().ok_or(Error::EmptyLog)
    }

    pub fn by_block_number(&self, block_number: u64) -> Option<StateRoot> {
        self.roots.read().get(&block_number).copied()
    }

    /// All committed roots, ascending by block number.
    pub fn iter_all(&self) -> Vec<StateRoot> {
        self.roots.read().values().copied().collect()
    }

    /// SHA-256 of a length-prefixed concatenation of tx-encoded bytes — the
    /// canonical state root used by the sequencer before submission.
    pub fn generate_state_root(serialized_txs: &[Vec<u8>]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for tx in serialized_txs {
            hasher.update((tx.len() as u32).to_be_bytes());
            hasher.update(tx);
        }
        hasher.finalize().into()
    }
}
