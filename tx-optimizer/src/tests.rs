use crate::config::Config;
use crate::engine::Optimizer;
use crate::error::Error;
use crate::worker::{OptimizerWorker, TxWorkResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use sequencer_types::{Amount, EventSink, TestClock, Tx, TxId, TxType};
use std::sync::Arc;
use std::time::Duration;

/// Succeeds instantly and records the order in which transactions reach it.
struct RecordingWorker {
    order: Mutex<Vec<TxId>>,
}

impl RecordingWorker {
    fn new() -> Self {
        Self { order: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl OptimizerWorker for RecordingWorker {
    async fn process(&self, tx: &Tx) -> TxWorkResult {
        self.order.lock().push(tx.id);
        TxWorkResult { success: true, hash: Some("0xhash".into()), error: None, processing_time_ms: 1 }
    }
}

fn transfer(priority: f64) -> Tx {
    let mut tx = Tx::new("a", "b", Amount::from(1u64), vec![], 21_000, TxType::Transfer);
    tx.priority = priority;
    tx
}

#[tokio::test]
async fn priority_aging_dispatches_low_priority_item_after_high_priority_one() {
    let config = Config { workers_per_type: 1, enable_adaptive_load_balancing: false, ..Config::default() };
    let clock = Arc::new(TestClock::new(0));
    let worker = Arc::new(RecordingWorker::new());
    let optimizer = Optimizer::new(config, EventSink::default(), clock.clone(), worker.clone());

    let tx_a = transfer(10.0);
    let tx_b = transfer(1.0);
    let id_a = tx_a.id;
    let id_b = tx_b.id;
    optimizer.submit(tx_a, 10.0).unwrap();
    optimizer.submit(tx_b, 1.0).unwrap();

    clock.advance(5_000);
    // effective priority at t=5s, factor=2.0: A = 10 + 5*2 = 20, B = 1 + 5*2 = 11.
    optimizer.process_tick().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    optimizer.process_tick().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let order = worker.order.lock().clone();
    assert_eq!(order, vec![id_a, id_b]);
}

#[tokio::test]
async fn submit_rejects_unsupported_type() {
    let config = Config { supported_transaction_types: vec![TxType::Transfer], ..Config::default() };
    let optimizer = Optimizer::new(config, EventSink::default(), Arc::new(TestClock::new(0)), Arc::new(RecordingWorker::new()));
    let tx = Tx::new("a", "b", Amount::from(1u64), vec![], 21_000, TxType::Swap);
    assert!(matches!(optimizer.submit(tx, 1.0), Err(Error::UnsupportedType(TxType::Swap))));
}

#[tokio::test]
async fn submit_rejects_once_per_type_queue_is_full() {
    let config = Config {
        supported_transaction_types: vec![TxType::Transfer],
        max_queue_size_per_type: 2,
        workers_per_type: 0,
        ..Config::default()
    };
    let optimizer = Optimizer::new(config, EventSink::default(), Arc::new(TestClock::new(0)), Arc::new(RecordingWorker::new()));
    optimizer.submit(transfer(1.0), 1.0).unwrap();
    optimizer.submit(transfer(1.0), 1.0).unwrap();
    assert!(matches!(optimizer.submit(transfer(1.0), 1.0), Err(Error::QueueFull(TxType::Transfer))));
}

#[tokio::test]
async fn expired_transactions_are_evicted_and_do_not_dispatch() {
    let config = Config {
        supported_transaction_types: vec![TxType::Transfer],
        transaction_timeout_ms: 1_000,
        enable_adaptive_load_balancing: false,
        ..Config::default()
    };
    let clock = Arc::new(TestClock::new(0));
    let worker = Arc::new(RecordingWorker::new());
    let optimizer = Optimizer::new(config, EventSink::default(), clock.clone(), worker.clone());

    optimizer.submit(transfer(1.0), 1.0).unwrap();
    clock.advance(2_000);
    optimizer.process_tick().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(worker.order.lock().is_empty());
    let status = optimizer.get_queue_status();
    assert_eq!(status[&TxType::Transfer].size, 0);
}

#[tokio::test]
async fn respawn_worker_resets_a_stuck_slot_so_dispatch_resumes() {
    let config = Config { workers_per_type: 1, enable_adaptive_load_balancing: false, ..Config::default() };
    let clock = Arc::new(TestClock::new(0));
    let worker = Arc::new(RecordingWorker::new());
    let optimizer = Optimizer::new(config, EventSink::default(), clock.clone(), worker.clone());

    // Simulate the original worker task having exited while its slot was
    // still marked busy: the slot must be freed and its sender replaced
    // before a new dispatch can reach it.
    optimizer.respawn_worker(TxType::Transfer, 0, clock.now_ms());
    let status = optimizer.get_worker_status();
    assert_eq!(status[&TxType::Transfer].total, 1);
    assert_eq!(status[&TxType::Transfer].average_load, 0.0);

    let tx = transfer(1.0);
    let id = tx.id;
    optimizer.submit(tx, 1.0).unwrap();
    optimizer.process_tick().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(worker.order.lock().clone(), vec![id]);
}

#[tokio::test]
async fn queue_status_reports_fill_percent() {
    let config = Config {
        supported_transaction_types: vec![TxType::Transfer],
        max_queue_size_per_type: 4,
        workers_per_type: 0,
        ..Config::default()
    };
    let optimizer = Optimizer::new(config, EventSink::default(), Arc::new(TestClock::new(0)), Arc::new(RecordingWorker::new()));
    optimizer.submit(transfer(1.0), 1.0).unwrap();
    let status = optimizer.get_queue_status();
    assert_eq!(status[&TxType::Transfer].size, 1);
    assert!((status[&TxType::Transfer].fill_percent - 25.0).abs() < 0.01);
}
