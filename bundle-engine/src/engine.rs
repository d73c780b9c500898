use crate::bundle::{Bundle, BundleStatus};
use crate::config::{AdaptiveMultipliers, Config};
use crate::error::{Error, Result};
use crate::metrics::{Metrics, PerformanceSnapshot};
use crate::score::optimization_score;
use crate::tax::TaxSystem;
use crate::worker::{BundleWorkResult, BundleWorker, WorkerIn, WorkerOut, WorkerSlot};
use parking_lot::Mutex;
use sequencer_types::{effective_priority, Amount, BundleId, Clock, Event, EventSink, Tx, TxStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct State {
    bundles: Vec<Bundle>,
    index: HashMap<BundleId, usize>,
    worker_slots: Vec<WorkerSlot>,
    multipliers: AdaptiveMultipliers,
    metrics: Metrics,
    processing_count: usize,
    current: Option<BundleId>,
}

impl State {
    fn get_mut(&mut self, id: BundleId) -> Option<&mut Bundle> {
        self.index.get(&id).map(|&i| &mut self.bundles[i])
    }

    fn get(&self, id: BundleId) -> Option<&Bundle> {
        self.index.get(&id).map(|&i| &self.bundles[i])
    }

    fn insert(&mut self, bundle: Bundle) -> BundleId {
        let id = bundle.id;
        let idx = self.bundles.len();
        self.bundles.push(bundle);
        self.index.insert(id, idx);
        id
    }
}

/// The Bundle Engine orchestrator: groups transactions into bundles under
/// adaptive size/gas caps, dispatches them to a fixed worker pool, applies
/// taxes, carves out retries, and commits adaptive feedback for future
/// bundles.
pub struct BundleEngine {
    config: Config,
    clock: Arc<dyn Clock>,
    tax_system: Arc<dyn TaxSystem>,
    events: EventSink,
    state: Mutex<State>,
    worker: Arc<dyn BundleWorker>,
    worker_senders: Mutex<Vec<mpsc::Sender<WorkerIn>>>,
    results_tx: mpsc::Sender<(usize, BundleId, WorkerOut)>,
}

impl BundleEngine {
    pub fn new(
        config: Config,
        tax_system: Arc<dyn TaxSystem>,
        events: EventSink,
        clock: Arc<dyn Clock>,
        worker: Arc<dyn BundleWorker>,
    ) -> Arc<Self> {
        let now = clock.now_ms();
        let worker_slots = (0..config.worker_threads).map(|i| WorkerSlot::new(i, now)).collect();

        let (results_tx, mut results_rx) = mpsc::channel(1024);

        let engine = Arc::new(Self {
            config,
            clock,
            tax_system,
            events,
            state: Mutex::new(State {
                bundles: Vec::new(),
                index: HashMap::new(),
                worker_slots,
                multipliers: AdaptiveMultipliers::default(),
                metrics: Metrics::default(),
                processing_count: 0,
                current: None,
            }),
            worker,
            worker_senders: Mutex::new(Vec::new()),
            results_tx,
        });

        {
            let mut senders = Vec::new();
            for i in 0..engine.config.worker_threads {
                senders.push(engine.spawn_worker_task(i));
            }
            *engine.worker_senders.lock() = senders;
        }

        let engine_for_loop = engine.clone();
        tokio::spawn(async move {
            while let Some((idx, bundle_id, out)) = results_rx.recv().await {
                engine_for_loop.handle_worker_out(idx, bundle_id, out).await;
            }
        });

        engine
    }

    fn spawn_worker_task(&self, index: usize) -> mpsc::Sender<WorkerIn> {
        let (tx, mut rx) = mpsc::channel::<WorkerIn>(16);
        let worker = self.worker.clone();
        let results_tx = self.results_tx.clone();
        let timeout = Duration::from_secs(self.config.timeout_seconds.max(1));

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    WorkerIn::ProcessBundle { bundle_id, txs, priority_fee } => {
                        let fut = worker.process_bundle(bundle_id, txs, priority_fee);
                        let out = match tokio::time::timeout(timeout, fut).await {
                            Ok(result) => WorkerOut::BundleResult(result),
                            Err(_) => WorkerOut::Error { message: "worker deadline exceeded".into() },
                        };
                        let _ = results_tx.send((index, bundle_id, out)).await;
                    }
                }
            }
        });

        tx
    }

    /// Opens a new Pending bundle; `expires_at = now + timeout_seconds`.
    pub fn create_bundle(&self, priority_fee: u64) -> BundleId {
        let mut state = self.state.lock();
        self.create_bundle_locked(&mut state, priority_fee)
    }

    fn create_bundle_locked(&self, state: &mut State, priority_fee: u64) -> BundleId {
        let now = self.clock.now_ms();
        let effective_max_size =
            ((self.config.max_transactions_per_bundle as f64) * state.multipliers.bundle_size).floor() as usize;
        let effective_max_gas =
            ((self.config.max_gas_per_bundle as f64) * state.multipliers.gas_limit).floor() as u64;

        let bundle = Bundle::new(now, self.config.timeout_seconds, priority_fee, effective_max_size.max(1), effective_max_gas.max(1));
        let id = state.insert(bundle);
        state.current = Some(id);
        id
    }

    /// The most recently auto-opened bundle, for callers following the
    /// "current open bundle" convenience instead of tracking ids themselves.
    pub fn current_bundle_id(&self) -> Option<BundleId> {
        self.state.lock().current
    }

    /// Validates and appends a transaction to a Pending bundle.
    pub async fn add_transaction(&self, bundle_id: BundleId, tx: Tx) -> Result<()> {
        // Validation happens under the lock (cheap, synchronous); the tax
        // collaborator call happens afterwards since it may be async.
        {
            let state = self.state.lock();
            let bundle = state.get(bundle_id).ok_or(Error::UnknownBundle(bundle_id))?;
            if bundle.status != BundleStatus::Pending {
                return Err(Error::NotPending(bundle_id));
            }
            if bundle.would_exceed_size() {
                return Err(Error::BundleFull(bundle_id));
            }
            if bundle.would_exceed_gas(tx.gas_limit) {
                return Err(Error::GasCapExceeded(bundle_id));
            }
        }

        let mut tx = tx;
        tx.priority = effective_priority(tx.priority, 0.0, 0.0);
        let taxed_tx = self.tax_system.apply_taxes(&tx, tx.tx_type).await;
        let tax_amount = self.tax_system.calculate_tax(&tx, tx.tx_type).await;

        let mut state = self.state.lock();
        let priority_fee = {
            let bundle = state.get_mut(bundle_id).ok_or(Error::UnknownBundle(bundle_id))?;
            bundle.transactions.push(taxed_tx);
            bundle.recompute_total_gas();
            bundle.taxes = bundle.taxes.checked_add(&tax_amount);
            bundle.types_present.insert(tx.tx_type);
            bundle.score = optimization_score(bundle);
            bundle.priority_fee
        };

        let reached_cap = state.get(bundle_id).map(|b| b.reached_cap()).unwrap_or(false);
        if reached_cap {
            self.create_bundle_locked(&mut state, priority_fee);
        }

        tracing::debug!(%bundle_id, tx_id = %tx.id, "added transaction to bundle");
        Ok(())
    }

    /// Moves Pending -> Queued; only queued, non-empty bundles are the
    /// *preferred* dispatch target, though the dispatch rule itself will
    /// also pick up non-empty Pending bundles directly.
    pub fn submit(&self, bundle_id: BundleId) -> Result<()> {
        let mut state = self.state.lock();
        let bundle = state.get_mut(bundle_id).ok_or(Error::UnknownBundle(bundle_id))?;
        if bundle.status != BundleStatus::Pending {
            return Err(Error::NotPending(bundle_id));
        }
        bundle.status = BundleStatus::Queued;
        Ok(())
    }

    /// Pending|Queued -> Aborted. A no-op (returns an error) on an already
    /// terminal bundle.
    pub fn abort(&self, bundle_id: BundleId) -> Result<()> {
        let mut state = self.state.lock();
        let bundle = state.get_mut(bundle_id).ok_or(Error::UnknownBundle(bundle_id))?;
        if !matches!(bundle.status, BundleStatus::Pending | BundleStatus::Queued) {
            return Err(Error::NotAbortable(bundle_id));
        }
        bundle.status = BundleStatus::Aborted;
        Ok(())
    }

    /// Expires overdue bundles and dispatches the next eligible bundle(s)
    /// to free worker slots.
    pub async fn process_tick(&self) {
        let now = self.clock.now_ms();
        let dispatches = {
            let mut state = self.state.lock();
            self.expire_locked(&mut state, now);
            self.select_dispatches_locked(&mut state, now)
        };

        for (idx, bundle_id, txs, priority_fee) in dispatches {
            let sender = self.worker_senders.lock().get(idx).cloned();
            let Some(sender) = sender else { continue };
            let msg = WorkerIn::ProcessBundle { bundle_id, txs, priority_fee: Amount::from(priority_fee) };
            if sender.send(msg).await.is_err() {
                // The task behind this slot has exited (panicked); replace it
                // so the slot does not stay permanently dead. Resource-class
                // failure: logged, retried, does not poison other work.
                tracing::error!(worker_idx = idx, "worker task gone, spawning replacement");
                let replacement = self.spawn_worker_task(idx);
                self.worker_senders.lock()[idx] = replacement;
                let mut state = self.state.lock();
                if let Some(bundle) = state.get_mut(bundle_id) {
                    if !bundle.status.is_terminal() {
                        bundle.status = BundleStatus::Failed;
                        state.metrics.bundles_failed += 1;
                    }
                }
                self.free_slot_locked(&mut state, idx);
            }
        }
    }

    fn expire_locked(&self, state: &mut State, now: u64) {
        let ids: Vec<BundleId> = state
            .bundles
            .iter()
            .filter(|b| matches!(b.status, BundleStatus::Pending | BundleStatus::Queued) && b.expires_at_ms <= now)
            .map(|b| b.id)
            .collect();

        for id in ids {
            let bundle = state.get_mut(id).expect("indexed");
            if bundle.is_empty() {
                bundle.status = BundleStatus::Expired;
                state.metrics.bundles_expired += 1;
            } else {
                // Forced into the dispatch pipeline: mark eligible now.
                bundle.status = BundleStatus::Queued;
            }
        }
    }

    fn select_dispatches_locked(
        &self,
        state: &mut State,
        now: u64,
    ) -> Vec<(usize, BundleId, Vec<Tx>, u64)> {
        let mut dispatches = Vec::new();

        loop {
            if state.processing_count >= self.config.max_concurrent_bundles {
                break;
            }
            let free_slot = state.worker_slots.iter().find(|s| s.is_free()).map(|s| s.index);
            let Some(slot_idx) = free_slot else { break };

            // Expired-and-non-empty bundles must go now, regardless of score.
            let expired_first = state
                .bundles
                .iter()
                .enumerate()
                .filter(|(_, b)| {
                    b.status == BundleStatus::Queued && !b.is_empty() && b.expires_at_ms <= now
                })
                .min_by_key(|(_, b)| b.created_at_ms)
                .map(|(i, _)| i);

            let candidate = expired_first.or_else(|| {
                state
                    .bundles
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| {
                        matches!(b.status, BundleStatus::Pending | BundleStatus::Queued) && !b.is_empty()
                    })
                    .max_by(|(_, a), (_, b)| {
                        a.score
                            .partial_cmp(&b.score)
                            .unwrap()
                            .then(b.created_at_ms.cmp(&a.created_at_ms))
                    })
                    .map(|(i, _)| i)
            });

            let Some(bundle_idx) = candidate else { break };

            let bundle = &mut state.bundles[bundle_idx];
            bundle.status = BundleStatus::Processing;
            bundle.worker_id = Some(slot_idx);
            for tx in &mut bundle.transactions {
                tx.status = TxStatus::Processing;
            }
            let txs = bundle.transactions.clone();
            let bundle_id = bundle.id;
            let priority_fee = bundle.priority_fee;

            state.worker_slots[slot_idx].load = 1;
            state.worker_slots[slot_idx].last_active_ms = now;
            state.processing_count += 1;

            dispatches.push((slot_idx, bundle_id, txs, priority_fee));
        }

        dispatches
    }

    async fn handle_worker_out(&self, worker_idx: usize, bundle_id: BundleId, out: WorkerOut) {
        match out {
            WorkerOut::Error { message } => {
                let worker_id = sequencer_types::WorkerId::new();
                {
                    let mut state = self.state.lock();
                    if let Some(bundle) = state.get_mut(bundle_id) {
                        if !bundle.status.is_terminal() {
                            bundle.status = BundleStatus::Failed;
                            state.metrics.bundles_failed += 1;
                        }
                    }
                    self.free_slot_locked(&mut state, worker_idx);
                }
                tracing::warn!(%bundle_id, worker_idx, %message, "worker error");
                self.events.publish(Event::WorkerError { tx_type: None, worker_id, error: message });
            }
            WorkerOut::BundleResult(result) => self.apply_bundle_result(worker_idx, result).await,
        }
    }

    fn free_slot_locked(&self, state: &mut State, idx: usize) {
        if let Some(slot) = state.worker_slots.get_mut(idx) {
            slot.load = 0;
            slot.last_active_ms = self.clock.now_ms();
        }
        state.processing_count = state.processing_count.saturating_sub(1);
    }

    async fn apply_bundle_result(&self, worker_idx: usize, result: BundleWorkResult) {
        let now = self.clock.now_ms();
        let outcomes_by_id: HashMap<_, _> =
            result.outcomes.iter().map(|o| (o.tx_id, o)).collect();

        enum PostLockWork {
            None,
            Tax { liquidity: Amount, marketing: Amount, development: Amount, burn: Amount, buyback: Amount },
        }

        let (post_work, retry_bundle_id, confirmed, failed, duration_ms) = {
            let mut state = self.state.lock();

            let aborted = state.get(result.bundle_id).map(|b| b.status == BundleStatus::Aborted).unwrap_or(true);
            if aborted {
                self.free_slot_locked(&mut state, worker_idx);
                tracing::info!(bundle_id = %result.bundle_id, "dropping result for aborted bundle");
                return;
            }

            let priority_fee = state.get(result.bundle_id).map(|b| b.priority_fee).unwrap_or(self.config.priority_fee);

            let mut retry_txs: Vec<Tx> = Vec::new();
            let mut confirmed_count = 0usize;
            let mut failed_count = 0usize;
            let mut tx_type_outcomes: Vec<(sequencer_types::TxType, bool)> = Vec::new();

            if let Some(bundle) = state.get_mut(result.bundle_id) {
                let max_retries = self.config.max_transaction_retries;
                let mut retained = Vec::with_capacity(bundle.transactions.len());
                for mut tx in std::mem::take(&mut bundle.transactions) {
                    let reported_success = outcomes_by_id.get(&tx.id).map(|o| o.success).unwrap_or(false);
                    let hash = outcomes_by_id.get(&tx.id).and_then(|o| o.hash.clone());
                    if reported_success {
                        tx.status = TxStatus::Confirmed;
                        tx.hash = hash;
                        confirmed_count += 1;
                        tx_type_outcomes.push((tx.tx_type, true));
                        retained.push(tx);
                    } else if tx.retry_count < max_retries {
                        tx.status = TxStatus::Retry;
                        tx.retry_count += 1;
                        retry_txs.push(tx);
                    } else {
                        tx.status = TxStatus::Failed;
                        failed_count += 1;
                        tx_type_outcomes.push((tx.tx_type, false));
                        retained.push(tx);
                    }
                }
                bundle.transactions = retained;
                bundle.recompute_total_gas();
                bundle.status = if result.success { BundleStatus::Completed } else { BundleStatus::Failed };
            }

            let retry_bundle_id = if !retry_txs.is_empty() {
                let new_id = self.create_bundle_locked(&mut state, priority_fee);
                if let Some(new_bundle) = state.get_mut(new_id) {
                    for tx in &mut retry_txs {
                        tx.status = TxStatus::Pending;
                    }
                    new_bundle.transactions = retry_txs;
                    new_bundle.recompute_total_gas();
                    new_bundle.types_present = new_bundle.transactions.iter().map(|t| t.tx_type).collect();
                    new_bundle.score = optimization_score(new_bundle);
                }
                Some(new_id)
            } else {
                None
            };

            let post_work = if result.success && confirmed_count > 0 {
                if let Some(bundle) = state.get(result.bundle_id) {
                    let t = bundle.taxes;
                    PostLockWork::Tax {
                        liquidity: t.liquidity,
                        marketing: t.marketing,
                        development: t.development,
                        burn: t.burn,
                        buyback: t.buyback,
                    }
                } else {
                    PostLockWork::None
                }
            } else {
                PostLockWork::None
            };

            if self.config.use_adaptive_bundling && result.success {
                let len = result.outcomes.len().max(1);
                let tps_observed = 1000.0 * len as f64 / result.processing_time_ms.max(1) as f64;
                if tps_observed > 10_000.0 {
                    state.multipliers.grow_size();
                } else if tps_observed < 5_000.0 {
                    state.multipliers.shrink_size();
                }
                let success_rate = confirmed_count as f64 / len as f64;
                if success_rate > 0.98 {
                    state.multipliers.grow_gas();
                } else if success_rate < 0.90 {
                    state.multipliers.shrink_gas();
                }
            }

            state.metrics.record_bundle_completion(now, result.outcomes.len());
            if result.success {
                state.metrics.bundles_completed += 1;
            } else {
                state.metrics.bundles_failed += 1;
            }
            for (tx_type, success) in &tx_type_outcomes {
                state.metrics.record_tx(*tx_type, *success);
            }
            state.metrics.transactions_retried += retry_bundle_id.map(|_| 1).unwrap_or(0);

            self.free_slot_locked(&mut state, worker_idx);

            (post_work, retry_bundle_id, confirmed_count, failed_count, result.processing_time_ms)
        };

        if let PostLockWork::Tax { liquidity, marketing, development, burn, buyback } = post_work {
            if let Err(err) = self.tax_system.execute_burn(burn).await {
                tracing::warn!(%err, "tax burn failed");
            }
            if let Err(err) = self.tax_system.execute_buyback(buyback).await {
                tracing::warn!(%err, "tax buyback failed");
            }
            if let Err(err) = self.tax_system.distribute_taxes(liquidity, marketing, development).await {
                tracing::warn!(%err, "tax distribution failed");
            }
        }

        tracing::info!(
            bundle_id = %result.bundle_id,
            success = result.success,
            confirmed,
            failed,
            retry_bundle = ?retry_bundle_id,
            "bundle processed"
        );
        self.events.publish(Event::BundleProcessed {
            bundle_id: result.bundle_id,
            success: result.success,
            confirmed,
            failed,
            duration_ms,
        });
    }

    /// Drives `process_tick` on the configured interval. Spawned by the
    /// binary as a background task; runs until the process exits.
    pub fn run_ticker(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval_ms = self.config.processing_interval_ms.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                interval.tick().await;
                self.process_tick().await;
            }
        })
    }

    pub fn get_performance_metrics(&self) -> PerformanceSnapshot {
        let state = self.state.lock();
        PerformanceSnapshot {
            since_ms: self.clock.now_ms(),
            bundles_completed: state.metrics.bundles_completed,
            bundles_failed: state.metrics.bundles_failed,
            bundles_expired: state.metrics.bundles_expired,
            bundles_aborted: state.metrics.bundles_aborted,
            transactions_confirmed: state.metrics.transactions_confirmed,
            transactions_failed: state.metrics.transactions_failed,
            transactions_retried: state.metrics.transactions_retried,
            rolling_tps: state.metrics.rolling_tps(self.clock.now_ms()),
            per_type: state.metrics.per_type.clone(),
            bundle_size_multiplier: state.multipliers.bundle_size,
            gas_limit_multiplier: state.multipliers.gas_limit,
        }
    }

    /// Read-only snapshot of a bundle, for tests and status queries.
    pub fn get_bundle(&self, id: BundleId) -> Option<Bundle> {
        self.state.lock().get(id).cloned()
    }
}
