use async_trait::async_trait;
use sequencer_types::{Amount, BundleId, TxId};

/// Messages sent to a worker task. A tagged union rather than a dynamically
/// typed payload, so workers pattern-match and the compiler rules out
/// malformed messages.
#[derive(Debug, Clone)]
pub enum WorkerIn {
    ProcessBundle { bundle_id: BundleId, txs: Vec<sequencer_types::Tx>, priority_fee: Amount },
}

#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub tx_id: TxId,
    pub success: bool,
    pub hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BundleWorkResult {
    pub bundle_id: BundleId,
    pub success: bool,
    pub outcomes: Vec<TxOutcome>,
    pub processing_time_ms: u64,
}

/// Messages returned from a worker task.
#[derive(Debug, Clone)]
pub enum WorkerOut {
    BundleResult(BundleWorkResult),
    Error { message: String },
}

/// The capability a worker provides: process a whole bundle at once and
/// report a per-transaction outcome. Implementors must not hold state
/// across bundles — every call receives everything it needs.
#[async_trait]
pub trait BundleWorker: Send + Sync {
    async fn process_bundle(
        &self,
        bundle_id: BundleId,
        txs: Vec<sequencer_types::Tx>,
        priority_fee: Amount,
    ) -> BundleWorkResult;
}

/// A record of a live worker's identity and current load, independent of
/// the OS/task running it.
#[derive(Debug, Clone)]
pub struct WorkerSlot {
    pub index: usize,
    pub active: bool,
    pub last_active_ms: u64,
    pub load: u8,
}

impl WorkerSlot {
    pub fn new(index: usize, now_ms: u64) -> Self {
        Self { index, active: true, last_active_ms: now_ms, load: 0 }
    }

    pub fn is_free(&self) -> bool {
        self.active && self.load == 0
    }
}
