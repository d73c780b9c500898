use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics::{ProcessingMetricsSnapshot, QueueStatus, TypeMetrics, WorkerStatus};
use crate::queue::{QueuedTransaction, TypeQueue};
use crate::worker::{OptimizerWorker, WorkerIn, WorkerOut, WorkerSlot};
use parking_lot::Mutex;
use sequencer_types::{Clock, Event, EventSink, Tx, TxId, TxType};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct TypeState {
    queue: TypeQueue,
    slots: Vec<WorkerSlot>,
    senders: Vec<mpsc::Sender<WorkerIn>>,
    metrics: TypeMetrics,
}

/// Maintains one queue and one worker sub-pool per transaction type;
/// dispatches the highest-effective-priority transaction to a free worker
/// and periodically rebalances workers across types by observed load.
pub struct Optimizer {
    config: Config,
    clock: Arc<dyn Clock>,
    events: EventSink,
    worker_impl: Arc<dyn OptimizerWorker>,
    types: Mutex<HashMap<TxType, TypeState>>,
    results_tx: mpsc::Sender<(TxType, usize, TxId, WorkerOut)>,
}

impl Optimizer {
    pub fn new(config: Config, events: EventSink, clock: Arc<dyn Clock>, worker_impl: Arc<dyn OptimizerWorker>) -> Arc<Self> {
        let now = clock.now_ms();
        let (results_tx, mut results_rx) = mpsc::channel(4096);

        let mut types = HashMap::new();
        for tx_type in &config.supported_transaction_types {
            types.insert(*tx_type, TypeState { queue: TypeQueue::default(), slots: Vec::new(), senders: Vec::new(), metrics: TypeMetrics::default() });
        }

        let optimizer = Arc::new(Self {
            config,
            clock,
            events,
            worker_impl,
            types: Mutex::new(types),
            results_tx,
        });

        {
            let mut types = optimizer.types.lock();
            let supported = optimizer.config.supported_transaction_types.clone();
            for tx_type in supported {
                for _ in 0..optimizer.config.workers_per_type {
                    let state = types.get_mut(&tx_type).expect("just inserted");
                    optimizer.spawn_worker(tx_type, state, now);
                }
            }
        }

        let optimizer_for_loop = optimizer.clone();
        tokio::spawn(async move {
            while let Some((tx_type, idx, tx_id, out)) = results_rx.recv().await {
                optimizer_for_loop.handle_result(tx_type, idx, tx_id, out).await;
            }
        });

        optimizer
    }

    fn spawn_worker(&self, tx_type: TxType, state: &mut TypeState, now_ms: u64) {
        let index = state.slots.len();
        let sender = self.spawn_worker_task(tx_type, index);
        state.slots.push(WorkerSlot::new(index, now_ms));
        state.senders.push(sender);
    }

    fn spawn_worker_task(&self, tx_type: TxType, index: usize) -> mpsc::Sender<WorkerIn> {
        let (tx, mut rx) = mpsc::channel::<WorkerIn>(16);
        let worker = self.worker_impl.clone();
        let results_tx = self.results_tx.clone();
        let timeout = Duration::from_millis(self.config.transaction_timeout_ms.max(1));

        tokio::spawn(async move {
            while let Some(WorkerIn::ProcessTransaction { tx: queued_tx }) = rx.recv().await {
                let tx_id = queued_tx.id;
                let fut = worker.process(&queued_tx);
                let out = match tokio::time::timeout(timeout, fut).await {
                    Ok(result) => WorkerOut::Result(result),
                    Err(_) => WorkerOut::Error { message: "worker deadline exceeded".into() },
                };
                let _ = results_tx.send((tx_type, index, tx_id, out)).await;
            }
        });

        tx
    }

    /// Replaces a slot whose worker task has exited, so the slot does not
    /// stay permanently pinned at `load == 1`.
    pub(crate) fn respawn_worker(&self, tx_type: TxType, idx: usize, now_ms: u64) {
        let replacement = self.spawn_worker_task(tx_type, idx);
        let mut types = self.types.lock();
        if let Some(state) = types.get_mut(&tx_type) {
            if let Some(sender) = state.senders.get_mut(idx) {
                *sender = replacement;
            }
            if let Some(slot) = state.slots.get_mut(idx) {
                *slot = WorkerSlot::new(idx, now_ms);
            }
        }
    }

    /// Rejects if `tx.tx_type` is not supported or the per-type queue is full.
    pub fn submit(&self, tx: Tx, priority: f64) -> Result<()> {
        let tx_type = tx.tx_type;
        if !self.config.supported_transaction_types.contains(&tx_type) {
            return Err(Error::UnsupportedType(tx_type));
        }
        let now = self.clock.now_ms();
        let mut types = self.types.lock();
        let state = types.get_mut(&tx_type).ok_or(Error::UnsupportedType(tx_type))?;
        if state.queue.len() >= self.config.max_queue_size_per_type {
            self.events.publish(Event::QueueFull { id: tx.id, tx_type });
            return Err(Error::QueueFull(tx_type));
        }
        state.queue.push(QueuedTransaction { tx, enqueued_at_ms: now, base_priority: priority, attempts: 0 });
        Ok(())
    }

    /// Expires overdue queue entries and dispatches to free workers.
    pub async fn process_tick(&self) {
        let now = self.clock.now_ms();
        let waiting_priority_factor = self.config.waiting_priority_factor;
        let transaction_timeout_ms = self.config.transaction_timeout_ms;

        let (dispatches, expired) = {
            let mut types = self.types.lock();
            let mut dispatches = Vec::new();
            let mut expired = Vec::new();
            for (tx_type, state) in types.iter_mut() {
                for (tx_id, wait_ms) in state.queue.evict_expired(now, transaction_timeout_ms) {
                    expired.push((*tx_type, tx_id, wait_ms));
                }
                loop {
                    let free_idx = state.slots.iter().find(|s| s.is_free()).map(|s| s.index);
                    let Some(idx) = free_idx else { break };
                    let Some(queued) = state.queue.pop_highest_priority(now, waiting_priority_factor) else { break };
                    state.slots[idx].load = 1;
                    state.slots[idx].last_active_ms = now;
                    dispatches.push((*tx_type, idx, queued));
                }
            }
            (dispatches, expired)
        };

        for (tx_type, tx_id, wait_ms) in expired {
            tracing::info!(%tx_id, %tx_type, wait_ms, "transaction expired");
            self.events.publish(Event::TransactionExpired { id: tx_id, tx_type, wait_ms });
        }

        for (tx_type, idx, queued) in dispatches {
            let tx_id = queued.tx.id;
            let sender = { self.types.lock().get(&tx_type).and_then(|s| s.senders.get(idx).cloned()) };
            let Some(sender) = sender else { continue };
            if sender.send(WorkerIn::ProcessTransaction { tx: queued.tx }).await.is_err() {
                tracing::error!(%tx_type, worker_idx = idx, "worker task gone, spawning replacement");
                self.respawn_worker(tx_type, idx, now);
                let worker_id = sequencer_types::WorkerId::new();
                self.events.publish(Event::WorkerError { tx_type: Some(tx_type), worker_id, error: "worker task exited".into() });
                self.events.publish(Event::TransactionProcessed {
                    id: tx_id,
                    tx_type,
                    success: false,
                    hash: None,
                    error: Some("worker task exited".into()),
                    duration_ms: 0,
                });
            }
        }
    }

    async fn handle_result(&self, tx_type: TxType, idx: usize, tx_id: TxId, out: WorkerOut) {
        let now = self.clock.now_ms();
        let (success, hash, error, duration_ms) = match out {
            WorkerOut::Result(r) => (r.success, r.hash, r.error, r.processing_time_ms),
            WorkerOut::Error { message } => (false, None, Some(message.clone()), 0),
        };

        {
            let mut types = self.types.lock();
            if let Some(state) = types.get_mut(&tx_type) {
                if let Some(slot) = state.slots.get_mut(idx) {
                    slot.load = 0;
                    slot.last_active_ms = now;
                }
                state.metrics.record(now, success, duration_ms);
            }
        }

        if error.is_some() && hash.is_none() && !success {
            let worker_id = sequencer_types::WorkerId::new();
            self.events.publish(Event::WorkerError { tx_type: Some(tx_type), worker_id, error: error.clone().unwrap_or_default() });
        }

        tracing::debug!(%tx_id, %tx_type, success, "transaction processed");
        self.events.publish(Event::TransactionProcessed { id: tx_id, tx_type, success, hash, error, duration_ms });
    }

    /// Periodic rebalancing of worker counts across types by observed load.
    pub async fn rebalance(&self) {
        if !self.config.enable_adaptive_load_balancing {
            return;
        }
        let now = self.clock.now_ms();
        let factor = self.config.adaptive_load_balancing_factor;

        let mut types = self.types.lock();
        let total_workers: usize = types.values().map(|s| s.slots.len()).sum();
        if total_workers == 0 {
            return;
        }

        let loads: HashMap<TxType, f64> = types
            .iter()
            .map(|(t, s)| {
                let load = 0.7 * s.queue.len() as f64 + 0.3 * s.metrics.throughput_last_minute(now);
                (*t, load)
            })
            .collect();
        let total_load: f64 = loads.values().sum();
        if total_load <= 0.0 {
            return;
        }

        let mut ideal: HashMap<TxType, i64> = loads
            .iter()
            .map(|(t, load)| (*t, (1i64).max((total_workers as f64 * load / total_load).round() as i64)))
            .collect();

        // Correct rounding drift so the ideal distribution still sums to
        // total_workers: take from the highest-load type, give to the
        // lowest-load type, never dropping a type below one worker.
        loop {
            let sum: i64 = ideal.values().sum();
            let drift = sum - total_workers as i64;
            if drift == 0 {
                break;
            }
            if drift > 0 {
                let Some((&t, _)) = loads.iter().max_by(|(ta, _), (tb, _)| {
                    loads[ta].partial_cmp(&loads[tb]).unwrap()
                }) else { break };
                let entry = ideal.get_mut(&t).unwrap();
                if *entry > 1 {
                    *entry -= 1;
                } else {
                    break;
                }
            } else {
                let Some((&t, _)) = loads.iter().min_by(|(ta, _), (tb, _)| {
                    loads[ta].partial_cmp(&loads[tb]).unwrap()
                }) else { break };
                *ideal.get_mut(&t).unwrap() += 1;
            }
        }

        for (tx_type, target) in ideal {
            let current = types.get(&tx_type).map(|s| s.slots.len() as i64).unwrap_or(0);
            let delta = target - current;
            if delta > 0 {
                let to_add = (delta as f64 * factor).ceil() as i64;
                for _ in 0..to_add {
                    let state = types.get_mut(&tx_type).expect("known type");
                    self.spawn_worker(tx_type, state, now);
                }
            } else if delta < 0 {
                let to_remove = ((-delta) as f64 * factor).ceil() as i64;
                for _ in 0..to_remove {
                    let Some(state) = types.get_mut(&tx_type) else { break };
                    if state.slots.len() <= 1 {
                        break;
                    }
                    // Remove lowest-load workers first.
                    let remove_idx = state
                        .slots
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, s)| s.load)
                        .map(|(i, _)| i);
                    if let Some(i) = remove_idx {
                        state.slots.remove(i);
                        state.senders.remove(i); // dropping the sender ends that worker's task loop
                    }
                }
            }
        }
    }

    pub fn get_queue_status(&self) -> HashMap<TxType, QueueStatus> {
        let now = self.clock.now_ms();
        self.types
            .lock()
            .iter()
            .map(|(t, s)| {
                let cap = self.config.max_queue_size_per_type.max(1);
                (
                    *t,
                    QueueStatus {
                        size: s.queue.len(),
                        fill_percent: 100.0 * s.queue.len() as f64 / cap as f64,
                        average_wait_ms: s.queue.average_wait_ms(now),
                        oldest_pending_age_ms: s.queue.oldest_age_ms(now),
                    },
                )
            })
            .collect()
    }

    pub fn get_worker_status(&self) -> HashMap<TxType, WorkerStatus> {
        self.types
            .lock()
            .iter()
            .map(|(t, s)| {
                let active = s.slots.iter().filter(|w| w.active).count();
                let avg_load = if s.slots.is_empty() {
                    0.0
                } else {
                    s.slots.iter().map(|w| w.load as f64).sum::<f64>() / s.slots.len() as f64
                };
                (*t, WorkerStatus { total: s.slots.len(), active, average_load: avg_load })
            })
            .collect()
    }

    pub fn get_processing_metrics(&self) -> HashMap<TxType, ProcessingMetricsSnapshot> {
        let now = self.clock.now_ms();
        self.types
            .lock()
            .iter()
            .map(|(t, s)| {
                (
                    *t,
                    ProcessingMetricsSnapshot {
                        processed: s.metrics.processed,
                        average_processing_time_ms: s.metrics.average_processing_time_ms(),
                        success_rate: s.metrics.success_rate(),
                        throughput_last_minute: s.metrics.throughput_last_minute(now),
                    },
                )
            })
            .collect()
    }

    pub fn run_ticker(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval_ms = self.config.processing_interval_ms.max(1);
        let rebalance_ms = self.config.adaptive_load_balancing_interval_ms.max(1);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(interval_ms));
            let mut rebalance = tokio::time::interval(Duration::from_millis(rebalance_ms));
            loop {
                tokio::select! {
                    _ = tick.tick() => self.process_tick().await,
                    _ = rebalance.tick() => self.rebalance().await,
                }
            }
        })
    }
}
