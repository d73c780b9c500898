use crate::config::Config;
use crate::tax::FixedRateTaxSystem;
use crate::worker::{BundleWorkResult, BundleWorker, TxOutcome};
use crate::{BundleEngine, BundleStatus};
use async_trait::async_trait;
use sequencer_types::{Amount, BundleId, Clock, EventSink, SystemClock, Tx, TxType};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// A worker whose outcome per transaction is driven by test fixtures rather
/// than real chain execution.
struct ScriptedWorker {
    always_succeed: bool,
    fail_ids: std::sync::Mutex<HashSet<sequencer_types::TxId>>,
}

impl ScriptedWorker {
    fn succeeding() -> Self {
        Self { always_succeed: true, fail_ids: std::sync::Mutex::new(HashSet::new()) }
    }

    fn failing(ids: impl IntoIterator<Item = sequencer_types::TxId>) -> Self {
        Self { always_succeed: false, fail_ids: std::sync::Mutex::new(ids.into_iter().collect()) }
    }
}

#[async_trait]
impl BundleWorker for ScriptedWorker {
    async fn process_bundle(
        &self,
        bundle_id: BundleId,
        txs: Vec<Tx>,
        _priority_fee: Amount,
    ) -> BundleWorkResult {
        let fail_ids = self.fail_ids.lock().unwrap();
        let outcomes = txs
            .iter()
            .map(|tx| {
                let success = self.always_succeed || !fail_ids.contains(&tx.id);
                TxOutcome { tx_id: tx.id, success, hash: success.then(|| "0xhash".to_string()) }
            })
            .collect();
        BundleWorkResult { bundle_id, success: true, outcomes, processing_time_ms: 50 }
    }
}

fn new_engine(worker: Arc<dyn BundleWorker>) -> Arc<BundleEngine> {
    let config = Config { processing_interval_ms: 10_000_000, ..Config::default() };
    BundleEngine::new(
        config,
        Arc::new(FixedRateTaxSystem::new(0)),
        EventSink::default(),
        Arc::new(SystemClock),
        worker,
    )
}

#[tokio::test]
async fn happy_bundle_completes_with_all_confirmed() {
    let engine = new_engine(Arc::new(ScriptedWorker::succeeding()));
    let bundle_id = engine.create_bundle(10);

    for tx_type in [TxType::Transfer, TxType::Transfer, TxType::Swap] {
        let tx = Tx::new("alice", "bob", Amount::from(100u64), vec![], 21_000, tx_type);
        engine.add_transaction(bundle_id, tx).await.unwrap();
    }
    engine.submit(bundle_id).unwrap();

    engine.process_tick().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let bundle = engine.get_bundle(bundle_id).unwrap();
    assert_eq!(bundle.status, BundleStatus::Completed);
    assert_eq!(bundle.transactions.len(), 3);
    assert!(bundle.transactions.iter().all(|tx| tx.status == sequencer_types::TxStatus::Confirmed));
}

#[tokio::test]
async fn retry_carving_moves_failed_recoverable_txs_to_new_bundle() {
    let mut ids = Vec::new();
    let mut txs = Vec::new();
    for _ in 0..5 {
        let tx = Tx::new("alice", "bob", Amount::from(1u64), vec![], 21_000, TxType::Transfer);
        ids.push(tx.id);
        txs.push(tx);
    }
    let failing_ids = vec![ids[1], ids[3]];

    let engine = new_engine(Arc::new(ScriptedWorker::failing(failing_ids.clone())));
    let bundle_id = engine.create_bundle(10);
    for tx in txs {
        engine.add_transaction(bundle_id, tx).await.unwrap();
    }
    engine.submit(bundle_id).unwrap();
    engine.process_tick().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let bundle = engine.get_bundle(bundle_id).unwrap();
    assert_eq!(bundle.status, BundleStatus::Completed);
    assert_eq!(bundle.transactions.len(), 3);
    assert!(bundle.transactions.iter().all(|tx| tx.status == sequencer_types::TxStatus::Confirmed));

    // The retry bundle is the most recently created one.
    let retry_id = engine.current_bundle_id().unwrap();
    assert_ne!(retry_id, bundle_id);
    let retry_bundle = engine.get_bundle(retry_id).unwrap();
    assert_eq!(retry_bundle.status, BundleStatus::Pending);
    assert_eq!(retry_bundle.transactions.len(), 2);
    let retry_ids: HashSet<_> = retry_bundle.transactions.iter().map(|tx| tx.id).collect();
    assert_eq!(retry_ids, failing_ids.into_iter().collect::<HashSet<_>>());
    assert!(retry_bundle.transactions.iter().all(|tx| tx.retry_count == 1));
}

#[tokio::test]
async fn adaptive_bundling_shrinks_effective_caps_on_low_throughput() {
    struct SlowWorker;
    #[async_trait]
    impl BundleWorker for SlowWorker {
        async fn process_bundle(&self, bundle_id: BundleId, txs: Vec<Tx>, _fee: Amount) -> BundleWorkResult {
            let outcomes = txs.iter().map(|tx| TxOutcome { tx_id: tx.id, success: true, hash: None }).collect();
            // 1 tx in 1000ms => tps_observed = 1000*1/1000 = 1 < 5000
            BundleWorkResult { bundle_id, success: true, outcomes, processing_time_ms: 1000 }
        }
    }

    let engine = new_engine(Arc::new(SlowWorker));
    let bundle_id = engine.create_bundle(10);
    let tx = Tx::new("a", "b", Amount::from(1u64), vec![], 21_000, TxType::Transfer);
    engine.add_transaction(bundle_id, tx).await.unwrap();
    engine.submit(bundle_id).unwrap();
    engine.process_tick().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let next_id = engine.create_bundle(10);
    let next = engine.get_bundle(next_id).unwrap();
    let default_max = Config::default().max_transactions_per_bundle;
    assert!(next.effective_max_size as f64 <= default_max as f64 * 0.95 + 0.01);
}

#[tokio::test]
async fn abort_is_a_no_op_once_terminal() {
    let engine = new_engine(Arc::new(ScriptedWorker::succeeding()));
    let bundle_id = engine.create_bundle(1);
    engine.abort(bundle_id).unwrap();
    assert!(engine.abort(bundle_id).is_err());
}

#[tokio::test]
async fn gas_invariant_holds_after_adds() {
    let engine = new_engine(Arc::new(ScriptedWorker::succeeding()));
    let bundle_id = engine.create_bundle(1);
    for _ in 0..4 {
        let tx = Tx::new("a", "b", Amount::from(1u64), vec![], 21_000, TxType::Transfer);
        engine.add_transaction(bundle_id, tx).await.unwrap();
    }
    let bundle = engine.get_bundle(bundle_id).unwrap();
    let sum: u64 = bundle.transactions.iter().map(|t| t.gas_limit).sum();
    assert_eq!(bundle.total_gas, sum);
    assert!(bundle.taxes.is_consistent());
}
