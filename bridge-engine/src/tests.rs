use crate::circuit_breaker::CircuitState;
use crate::collaborators::{ExecError, ExecutionOutcome, Executor, VerificationOutcome, VerificationStatus, Verifier};
use crate::config::Config;
use crate::engine::BridgeEngine;
use crate::types::{BridgeTx, BridgeTxStatus, BridgeTxType};
use async_trait::async_trait;
use sequencer_types::{Amount, BridgeTxId, EventSink, TestClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn submit_tx(engine: &BridgeEngine, tx_type: BridgeTxType) -> BridgeTxId {
    engine.submit(tx_type, "ethereum", "0xsource", "arbitrum", "0xdestination", "ETH", Amount::from(1_000u64))
}

struct AlwaysSucceedExecutor;
#[async_trait]
impl Executor for AlwaysSucceedExecutor {
    async fn execute(&self, _tx: &BridgeTx, _attempt: u32) -> ExecutionOutcome {
        ExecutionOutcome { success: true, hash: Some("0xexec".into()), error: None }
    }
}

struct AlwaysCompleteVerifier;
#[async_trait]
impl Verifier for AlwaysCompleteVerifier {
    async fn verify(&self, _tx: &BridgeTx) -> VerificationOutcome {
        VerificationOutcome { status: VerificationStatus::Completed, destination_hash: Some("0xdest".into()), error: None }
    }
}

struct FlakyExecutor {
    calls: AtomicUsize,
}
impl FlakyExecutor {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}
#[async_trait]
impl Executor for FlakyExecutor {
    async fn execute(&self, _tx: &BridgeTx, _attempt: u32) -> ExecutionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ExecutionOutcome {
            success: false,
            hash: None,
            error: Some(ExecError { message: "rpc timeout".into(), code: None, details: None, recoverable: true }),
        }
    }
}

fn quiescent_config() -> Config {
    Config { transaction_check_interval_ms: 10_000_000, monitoring_interval_ms: 10_000_000, ..Config::default() }
}

#[tokio::test]
async fn happy_path_completes_once_executor_and_verifier_both_succeed() {
    let clock = Arc::new(TestClock::new(0));
    let engine = BridgeEngine::new(quiescent_config(), EventSink::default(), clock.clone());
    let route = BridgeTxType::from("route-a");
    engine.register_executor(route.clone(), Arc::new(AlwaysSucceedExecutor));
    engine.register_verifier(route.clone(), Arc::new(AlwaysCompleteVerifier));

    let id = submit_tx(&engine, route);
    engine.process_tick().await; // Pending -> InProgress
    assert_eq!(engine.get(id).unwrap().status, BridgeTxStatus::InProgress);

    engine.process_tick().await; // InProgress -> Completed
    let tx = engine.get(id).unwrap();
    assert_eq!(tx.status, BridgeTxStatus::Completed);
    assert_eq!(tx.destination_hash.as_deref(), Some("0xdest"));
    assert_eq!(tx.source_hash.as_deref(), Some("0xexec"));
    assert!(tx.completed_at_ms.is_some());
}

#[tokio::test]
async fn missing_executor_fails_immediately_with_protocol_reason() {
    let clock = Arc::new(TestClock::new(0));
    let engine = BridgeEngine::new(quiescent_config(), EventSink::default(), clock);
    let id = submit_tx(&engine, BridgeTxType::from("unregistered"));
    engine.process_tick().await;
    let tx = engine.get(id).unwrap();
    assert_eq!(tx.status, BridgeTxStatus::Failed);
    assert_eq!(tx.errors.len(), 1);
}

#[tokio::test]
async fn transaction_times_out_once_its_age_exceeds_the_configured_budget() {
    let config = Config { transaction_timeout_ms: 1_000, ..quiescent_config() };
    let clock = Arc::new(TestClock::new(0));
    let engine = BridgeEngine::new(config, EventSink::default(), clock.clone());
    let route = BridgeTxType::from("route-a");
    engine.register_executor(route.clone(), Arc::new(AlwaysSucceedExecutor));
    struct NeverVerifier;
    #[async_trait]
    impl Verifier for NeverVerifier {
        async fn verify(&self, _tx: &BridgeTx) -> VerificationOutcome {
            VerificationOutcome { status: VerificationStatus::InProgress, destination_hash: None, error: None }
        }
    }
    engine.register_verifier(route.clone(), Arc::new(NeverVerifier));

    let id = submit_tx(&engine, route);
    engine.process_tick().await; // Pending -> InProgress
    clock.advance(2_000);
    engine.process_tick().await; // age exceeds timeout -> TimedOut

    assert_eq!(engine.get(id).unwrap().status, BridgeTxStatus::TimedOut);
}

/// Three recoverable errors within the window open the breaker; execution
/// is suppressed until `reset_ms` elapses, then a clean monitoring tick
/// closes it.
#[tokio::test]
async fn three_recoverable_errors_open_the_breaker_then_it_recovers() {
    let config = Config {
        circuit_breaker_error_threshold: 3,
        circuit_breaker_window_ms: 10_000,
        circuit_breaker_reset_ms: 5_000,
        max_retries: 10,
        initial_retry_delay_ms: 1,
        max_retry_delay_ms: 1,
        ..quiescent_config()
    };
    let clock = Arc::new(TestClock::new(0));
    let engine = BridgeEngine::new(config, EventSink::default(), clock.clone());
    let route = BridgeTxType::from("route-a");
    let executor = Arc::new(FlakyExecutor::new());
    engine.register_executor(route.clone(), executor.clone());
    engine.register_verifier(route.clone(), Arc::new(AlwaysCompleteVerifier));

    for _ in 0..3 {
        submit_tx(&engine, route.clone());
    }

    engine.process_tick().await;
    assert_eq!(engine.circuit_state(), CircuitState::Open);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 3);

    // While Open, a newly submitted Pending transaction is not executed.
    let suppressed = submit_tx(&engine, route.clone());
    engine.process_tick().await;
    assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
    assert_eq!(engine.get(suppressed).unwrap().status, BridgeTxStatus::Pending);

    clock.advance(5_000);
    engine.monitor_tick().await;
    assert_eq!(engine.circuit_state(), CircuitState::HalfOpen);

    // A clean monitoring tick (no errors recorded while half-open) closes it.
    engine.monitor_tick().await;
    assert_eq!(engine.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn attempts_never_exceed_max_retries_at_the_failed_transition() {
    let config = Config { max_retries: 2, initial_retry_delay_ms: 1, max_retry_delay_ms: 1, circuit_breaker_error_threshold: 1_000, ..quiescent_config() };
    let clock = Arc::new(TestClock::new(0));
    let engine = BridgeEngine::new(config, EventSink::default(), clock.clone());
    let route = BridgeTxType::from("route-a");
    engine.register_executor(route.clone(), Arc::new(FlakyExecutor::new()));
    engine.register_verifier(route.clone(), Arc::new(AlwaysCompleteVerifier));

    let id = submit_tx(&engine, route);
    for _ in 0..5 {
        clock.advance(10);
        engine.process_tick().await;
    }

    let tx = engine.get(id).unwrap();
    assert_eq!(tx.status, BridgeTxStatus::Failed);
    assert!(tx.attempts <= 2);
    assert!(tx.errors.len() >= 2);
}

#[tokio::test]
async fn cancel_is_rejected_once_a_transaction_is_terminal() {
    let clock = Arc::new(TestClock::new(0));
    let engine = BridgeEngine::new(quiescent_config(), EventSink::default(), clock);
    let route = BridgeTxType::from("route-a");
    engine.register_executor(route.clone(), Arc::new(AlwaysSucceedExecutor));
    engine.register_verifier(route.clone(), Arc::new(AlwaysCompleteVerifier));

    let id = submit_tx(&engine, route);
    engine.process_tick().await;
    engine.process_tick().await;
    assert_eq!(engine.get(id).unwrap().status, BridgeTxStatus::Completed);
    assert!(engine.cancel(id).is_err());
}
