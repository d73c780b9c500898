use sequencer_types::{BundleId, TaxAmount, Tx, TxType};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    Expired,
    Aborted,
}

impl BundleStatus {
    /// Once Completed/Failed/Expired/Aborted a bundle is terminal: its
    /// state never changes again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BundleStatus::Completed | BundleStatus::Failed | BundleStatus::Expired | BundleStatus::Aborted
        )
    }
}

#[derive(Debug, Clone)]
pub struct Bundle {
    pub id: BundleId,
    pub transactions: Vec<Tx>,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
    pub total_gas: u64,
    pub taxes: TaxAmount,
    pub status: BundleStatus,
    pub worker_id: Option<usize>,
    pub score: f64,
    pub types_present: BTreeSet<TxType>,
    pub priority_fee: u64,
    pub effective_max_size: usize,
    pub effective_max_gas: u64,
}

impl Bundle {
    pub fn new(
        created_at_ms: u64,
        timeout_seconds: u64,
        priority_fee: u64,
        effective_max_size: usize,
        effective_max_gas: u64,
    ) -> Self {
        Self {
            id: BundleId::new(),
            transactions: Vec::new(),
            created_at_ms,
            expires_at_ms: created_at_ms + timeout_seconds * 1000,
            total_gas: 0,
            taxes: TaxAmount::default(),
            status: BundleStatus::Pending,
            worker_id: None,
            score: 0.0,
            types_present: BTreeSet::new(),
            priority_fee,
            effective_max_size,
            effective_max_gas,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// `total_gas == sum of tx.gas_limit for tx in transactions`.
    pub fn recompute_total_gas(&mut self) {
        self.total_gas = self.transactions.iter().map(|tx| tx.gas_limit).sum();
    }

    pub fn would_exceed_size(&self) -> bool {
        self.transactions.len() >= self.effective_max_size
    }

    pub fn would_exceed_gas(&self, added_gas: u64) -> bool {
        self.total_gas + added_gas > self.effective_max_gas
    }

    pub fn reached_cap(&self) -> bool {
        self.transactions.len() >= self.effective_max_size || self.total_gas >= self.effective_max_gas
    }
}
