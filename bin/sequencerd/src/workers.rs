use async_trait::async_trait;
use bundle_engine::{BundleWorkResult, BundleWorker, TxOutcome};
use sequencer_types::{Amount, BundleId, Tx, TxId};
use tx_optimizer::{OptimizerWorker, TxWorkResult};

/// Marks every transaction confirmed without touching any chain — the
/// out-of-the-box worker for running the sequencer before a real executor
/// (RPC client, local EVM, etc.) is wired in.
pub struct LoggingBundleWorker;

#[async_trait]
impl BundleWorker for LoggingBundleWorker {
    async fn process_bundle(&self, bundle_id: BundleId, txs: Vec<Tx>, priority_fee: Amount) -> BundleWorkResult {
        tracing::debug!(%bundle_id, count = txs.len(), %priority_fee, "processing bundle (no-op worker)");
        let outcomes = txs.iter().map(|tx| TxOutcome { tx_id: tx.id, success: true, hash: Some(placeholder_hash(tx.id)) }).collect();
        BundleWorkResult { bundle_id, success: true, outcomes, processing_time_ms: 1 }
    }
}

pub struct LoggingOptimizerWorker;

#[async_trait]
impl OptimizerWorker for LoggingOptimizerWorker {
    async fn process(&self, tx: &Tx) -> TxWorkResult {
        tracing::debug!(id = %tx.id, tx_type = %tx.tx_type, "processing transaction (no-op worker)");
        TxWorkResult { success: true, hash: Some(placeholder_hash(tx.id)), error: None, processing_time_ms: 1 }
    }
}

fn placeholder_hash(id: TxId) -> String {
    format!("0x{id}")
}
