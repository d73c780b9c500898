use crate::backoff::retry_delay_ms;
use crate::circuit_breaker::{CircuitBreaker, Transition};
use crate::collaborators::{ExecError, Executor, ExecutionOutcome, VerificationStatus, Verifier};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{BridgeTx, BridgeTxStatus, BridgeTxType, ErrorRecord};
use parking_lot::{Mutex, RwLock};
use sequencer_types::{Amount, BridgeTxId, Clock, Event, EventSink};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct State {
    arena: Vec<BridgeTx>,
    index: HashMap<BridgeTxId, usize>,
}

/// Owns a per-bridge-transaction state machine and a process-wide circuit
/// breaker. Unlike Bundle Engine and Optimizer, execution here is not
/// dispatched to a worker pool: the tick loop itself calls registered
/// executors/verifiers in sequence, which is what gives each transaction id
/// its strictly-serial execution guarantee for free.
pub struct BridgeEngine {
    config: RwLock<Config>,
    clock: Arc<dyn Clock>,
    events: EventSink,
    executors: RwLock<HashMap<BridgeTxType, Arc<dyn Executor>>>,
    verifiers: RwLock<HashMap<BridgeTxType, Arc<dyn Verifier>>>,
    state: Mutex<State>,
    breaker: Mutex<CircuitBreaker>,
    tick_handle: Mutex<Option<JoinHandle<()>>>,
    monitor_handle: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeEngine {
    pub fn new(config: Config, events: EventSink, clock: Arc<dyn Clock>) -> Arc<Self> {
        let breaker = CircuitBreaker::new(config.circuit_breaker_error_threshold, config.circuit_breaker_window_ms, config.circuit_breaker_reset_ms);
        let engine = Arc::new(Self {
            config: RwLock::new(config),
            clock,
            events,
            executors: RwLock::new(HashMap::new()),
            verifiers: RwLock::new(HashMap::new()),
            state: Mutex::new(State { arena: Vec::new(), index: HashMap::new() }),
            breaker: Mutex::new(breaker),
            tick_handle: Mutex::new(None),
            monitor_handle: Mutex::new(None),
        });
        Self::spawn_loops(&engine);
        engine
    }

    fn spawn_loops(engine: &Arc<Self>) {
        let mut tick_handle = engine.tick_handle.lock();
        if let Some(old) = tick_handle.take() {
            old.abort();
        }
        let mut monitor_handle = engine.monitor_handle.lock();
        if let Some(old) = monitor_handle.take() {
            old.abort();
        }

        let e = engine.clone();
        *tick_handle = Some(tokio::spawn(async move {
            loop {
                let interval_ms = e.config.read().transaction_check_interval_ms.max(1);
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                e.process_tick().await;
            }
        }));

        let e = engine.clone();
        *monitor_handle = Some(tokio::spawn(async move {
            loop {
                let interval_ms = e.config.read().monitoring_interval_ms.max(1);
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                e.monitor_tick().await;
            }
        }));
    }

    /// Replaces the live configuration. Per the resolved design note, both
    /// the processing tick and the monitoring tick are restarted whenever
    /// either interval changes, not just the monitoring one.
    pub fn update_config(engine: &Arc<Self>, new_config: Config) {
        let restart = {
            let current = engine.config.read();
            current.transaction_check_interval_ms != new_config.transaction_check_interval_ms
                || current.monitoring_interval_ms != new_config.monitoring_interval_ms
        };
        *engine.config.write() = new_config;
        if restart {
            Self::spawn_loops(engine);
        }
    }

    pub fn register_executor(&self, tx_type: BridgeTxType, executor: Arc<dyn Executor>) {
        self.executors.write().insert(tx_type, executor);
    }

    pub fn register_verifier(&self, tx_type: BridgeTxType, verifier: Arc<dyn Verifier>) {
        self.verifiers.write().insert(tx_type, verifier);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &self,
        tx_type: BridgeTxType,
        source_chain: impl Into<String>,
        source_address: impl Into<String>,
        destination_chain: impl Into<String>,
        destination_address: impl Into<String>,
        token: impl Into<String>,
        amount: Amount,
    ) -> BridgeTxId {
        let now = self.clock.now_ms();
        let tx = BridgeTx::new(tx_type, source_chain, source_address, destination_chain, destination_address, token, amount, now);
        let id = tx.id;
        let mut state = self.state.lock();
        let idx = state.arena.len();
        state.index.insert(id, idx);
        state.arena.push(tx);
        id
    }

    pub fn get(&self, id: BridgeTxId) -> Option<BridgeTx> {
        self.snapshot_tx(id)
    }

    pub fn circuit_state(&self) -> crate::circuit_breaker::CircuitState {
        self.breaker.lock().state()
    }

    /// Cancels any non-terminal transaction. A no-op error on an
    /// already-terminal one, never a state change.
    pub fn cancel(&self, id: BridgeTxId) -> Result<()> {
        let now = self.clock.now_ms();
        let outcome = self
            .with_tx(id, |tx| {
                if tx.status.is_terminal() {
                    false
                } else {
                    tx.status = BridgeTxStatus::Cancelled;
                    tx.updated_at_ms = now;
                    true
                }
            })
            .ok_or(Error::UnknownTransaction(id))?;
        if !outcome {
            return Err(Error::NotCancellable(id));
        }
        self.events.publish(Event::BridgeTransactionCancelled { id });
        Ok(())
    }

    fn with_tx<R>(&self, id: BridgeTxId, f: impl FnOnce(&mut BridgeTx) -> R) -> Option<R> {
        let mut state = self.state.lock();
        let idx = *state.index.get(&id)?;
        Some(f(&mut state.arena[idx]))
    }

    fn snapshot_tx(&self, id: BridgeTxId) -> Option<BridgeTx> {
        self.with_tx(id, |tx| tx.clone())
    }

    pub async fn process_tick(&self) {
        let snapshot_ids: Vec<BridgeTxId> = {
            let state = self.state.lock();
            state.arena.iter().filter(|tx| !tx.status.is_terminal()).map(|tx| tx.id).collect()
        };
        for id in snapshot_ids {
            let Some(status) = self.with_tx(id, |tx| tx.status) else { continue };
            match status {
                BridgeTxStatus::Pending => self.handle_pending(id).await,
                BridgeTxStatus::InProgress => self.handle_in_progress(id).await,
                BridgeTxStatus::Retrying => self.handle_retrying(id).await,
                _ => {}
            }
        }
    }

    async fn handle_pending(&self, id: BridgeTxId) {
        let now = self.clock.now_ms();
        if !self.breaker.lock().allows_execute() {
            return;
        }
        let Some(tx) = self.snapshot_tx(id) else { return };
        let executor = self.executors.read().get(&tx.tx_type).cloned();
        let Some(executor) = executor else {
            self.fail_missing(id, now, "no executor registered for this bridge transaction type");
            return;
        };
        let attempt = tx.attempts + 1;
        let outcome = executor.execute(&tx, attempt).await;
        self.apply_execution_outcome(id, attempt, outcome, false).await;
    }

    async fn handle_retrying(&self, id: BridgeTxId) {
        let now = self.clock.now_ms();
        if !self.breaker.lock().allows_execute() {
            return;
        }
        let Some(tx) = self.snapshot_tx(id) else { return };
        if tx.next_retry_at_ms.map_or(true, |at| now < at) {
            return;
        }
        let executor = self.executors.read().get(&tx.tx_type).cloned();
        let Some(executor) = executor else {
            self.fail_missing(id, now, "no executor registered for this bridge transaction type");
            return;
        };
        let attempt = tx.attempts + 1;
        let outcome = executor.execute(&tx, attempt).await;
        self.apply_execution_outcome(id, attempt, outcome, true).await;
    }

    async fn handle_in_progress(&self, id: BridgeTxId) {
        let now = self.clock.now_ms();
        let Some(tx) = self.snapshot_tx(id) else { return };
        let timeout_ms = self.config.read().transaction_timeout_ms;
        if now.saturating_sub(tx.created_at_ms) > timeout_ms {
            self.with_tx(id, |tx| {
                tx.status = BridgeTxStatus::TimedOut;
                tx.updated_at_ms = now;
            });
            self.events.publish(Event::BridgeTransactionTimedOut { id });
            return;
        }
        let verifier = self.verifiers.read().get(&tx.tx_type).cloned();
        let Some(verifier) = verifier else {
            self.fail_missing(id, now, "no verifier registered for this bridge transaction type");
            return;
        };
        let outcome = verifier.verify(&tx).await;
        match outcome.status {
            VerificationStatus::InProgress => {}
            VerificationStatus::Completed => {
                self.with_tx(id, |tx| {
                    tx.status = BridgeTxStatus::Completed;
                    tx.updated_at_ms = now;
                    tx.completed_at_ms = Some(now);
                    if outcome.destination_hash.is_some() {
                        tx.destination_hash = outcome.destination_hash.clone();
                    }
                });
                self.events.publish(Event::BridgeTransactionCompleted { id });
            }
            VerificationStatus::Failed => {
                let err = outcome.error.unwrap_or(ExecError {
                    message: "verification failed".into(),
                    code: None,
                    details: None,
                    recoverable: true,
                });
                self.handle_error(id, tx.attempts, err).await;
            }
        }
    }

    async fn apply_execution_outcome(&self, id: BridgeTxId, attempt: u32, outcome: ExecutionOutcome, was_retry: bool) {
        let now = self.clock.now_ms();
        if outcome.success {
            self.with_tx(id, |tx| {
                tx.attempts = attempt;
                tx.status = BridgeTxStatus::InProgress;
                tx.updated_at_ms = now;
                tx.next_retry_at_ms = None;
                if tx.source_hash.is_none() {
                    tx.source_hash = outcome.hash.clone();
                }
            });
            if was_retry {
                self.events.publish(Event::BridgeTransactionRetried { id });
            }
        } else {
            let err = outcome.error.unwrap_or(ExecError {
                message: "executor failed without detail".into(),
                code: None,
                details: None,
                recoverable: true,
            });
            self.handle_error(id, attempt, err).await;
        }
    }

    /// On any executor/verifier failure: records the error, decides
    /// Retrying vs. Failed, then consults the circuit breaker.
    ///
    /// `attempt` is the attempt count already spent reaching this failure —
    /// `tx.updated_at_ms` is read (for the pre-mutation elapsed time used in
    /// any downstream log line) before this call mutates it.
    async fn handle_error(&self, id: BridgeTxId, attempt: u32, err: ExecError) {
        let now = self.clock.now_ms();
        // Captured before `with_tx` below overwrites `updated_at_ms`, so the
        // elapsed time logged for this failure reflects time since the
        // *previous* transition, not zero.
        let pre_update_at = self.with_tx(id, |tx| tx.updated_at_ms).unwrap_or(now);
        let (max_retries, initial, factor, max_delay) = {
            let c = self.config.read();
            (c.max_retries, c.initial_retry_delay_ms, c.retry_backoff_factor, c.max_retry_delay_ms)
        };

        let next_status = if err.recoverable && attempt < max_retries { BridgeTxStatus::Retrying } else { BridgeTxStatus::Failed };
        let delay_ms = match next_status {
            BridgeTxStatus::Retrying => Some(retry_delay_ms(attempt, initial, factor, max_delay, rand::random())),
            _ => None,
        };

        let record = ErrorRecord { message: err.message.clone(), code: err.code.clone(), details: err.details.clone(), recoverable: err.recoverable, at_ms: now };
        self.with_tx(id, |tx| {
            tx.attempts = attempt;
            tx.status = next_status;
            tx.updated_at_ms = now;
            tx.errors.push(record);
            tx.next_retry_at_ms = delay_ms.map(|d| now + d);
        });

        match next_status {
            BridgeTxStatus::Retrying => {
                let elapsed_ms = now.saturating_sub(pre_update_at);
                tracing::debug!(%id, attempt, delay_ms = delay_ms.unwrap_or(0), elapsed_ms, "bridge transaction scheduled for retry");
                self.events.publish(Event::BridgeTransactionRetrying { id, attempt, delay_ms: delay_ms.unwrap_or(0) });
            }
            BridgeTxStatus::Failed => {
                tracing::warn!(%id, reason = %err.message, "bridge transaction failed");
                self.events.publish(Event::BridgeTransactionFailed { id, reason: err.message.clone() });
            }
            _ => unreachable!("handle_error only ever transitions to Retrying or Failed"),
        }

        let transition = self.breaker.lock().record_error(now);
        self.publish_breaker_transition(transition);
    }

    fn fail_missing(&self, id: BridgeTxId, now: u64, reason: &str) {
        let record = ErrorRecord { message: reason.to_string(), code: None, details: None, recoverable: false, at_ms: now };
        self.with_tx(id, |tx| {
            tx.status = BridgeTxStatus::Failed;
            tx.updated_at_ms = now;
            tx.errors.push(record);
        });
        tracing::warn!(%id, reason, "bridge transaction failed: missing collaborator");
        self.events.publish(Event::BridgeTransactionFailed { id, reason: reason.to_string() });
    }

    fn publish_breaker_transition(&self, transition: Transition) {
        match transition {
            Transition::Opened => {
                tracing::warn!("circuit breaker open");
                self.events.publish(Event::CircuitBreakerOpen);
            }
            Transition::HalfOpened => {
                tracing::info!("circuit breaker half-open");
                self.events.publish(Event::CircuitBreakerHalfOpen);
            }
            Transition::Closed => {
                tracing::info!("circuit breaker closed");
                self.events.publish(Event::CircuitBreakerClosed);
            }
            Transition::None => {}
        }
    }

    pub(crate) async fn monitor_tick(&self) {
        let now = self.clock.now_ms();
        let transition = self.breaker.lock().on_monitoring_tick(now);
        self.publish_breaker_transition(transition);

        let (pending, in_progress, retrying) = {
            let state = self.state.lock();
            state.arena.iter().fold((0u32, 0u32, 0u32), |(p, i, r), tx| match tx.status {
                BridgeTxStatus::Pending => (p + 1, i, r),
                BridgeTxStatus::InProgress => (p, i + 1, r),
                BridgeTxStatus::Retrying => (p, i, r + 1),
                _ => (p, i, r),
            })
        };
        let summary = format!("{{\"pending\":{pending},\"in_progress\":{in_progress},\"retrying\":{retrying}}}");
        self.events.publish(Event::Stats(Arc::from(summary)));
    }
}
