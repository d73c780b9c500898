use async_trait::async_trait;
use sequencer_types::Tx;

#[derive(Debug, Clone)]
pub enum WorkerIn {
    ProcessTransaction { tx: Tx },
}

#[derive(Debug, Clone)]
pub struct TxWorkResult {
    pub success: bool,
    pub hash: Option<String>,
    pub error: Option<String>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone)]
pub enum WorkerOut {
    Result(TxWorkResult),
    Error { message: String },
}

/// The capability a per-type worker provides: process exactly one
/// transaction per call and report its outcome.
#[async_trait]
pub trait OptimizerWorker: Send + Sync {
    async fn process(&self, tx: &Tx) -> TxWorkResult;
}

/// A record of a live per-type worker's identity and current load.
#[derive(Debug, Clone)]
pub struct WorkerSlot {
    pub index: usize,
    pub active: bool,
    pub last_active_ms: u64,
    pub load: u32,
}

impl WorkerSlot {
    pub fn new(index: usize, now_ms: u64) -> Self {
        Self { index, active: true, last_active_ms: now_ms, load: 0 }
    }

    pub fn is_free(&self) -> bool {
        self.active && self.load == 0
    }
}
