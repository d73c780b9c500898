use crate::ids::{BridgeTxId, BundleId, TxId, WorkerId};
use crate::tx::TxType;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Every observable event named in the external-interfaces contract.
///
/// Engines never inherit from an emitter base type; they accept an
/// `EventSink` (a cloneable broadcast sender) at construction time and
/// publish tagged variants on it. Subscribers that are not interested in
/// events, or that attach after the fact, simply never call `subscribe`.
#[derive(Debug, Clone)]
pub enum Event {
    BundleProcessed {
        bundle_id: BundleId,
        success: bool,
        confirmed: usize,
        failed: usize,
        duration_ms: u64,
    },
    TransactionProcessed {
        id: TxId,
        tx_type: TxType,
        success: bool,
        hash: Option<String>,
        error: Option<String>,
        duration_ms: u64,
    },
    TransactionExpired {
        id: TxId,
        tx_type: TxType,
        wait_ms: u64,
    },
    QueueFull {
        id: TxId,
        tx_type: TxType,
    },
    WorkerError {
        tx_type: Option<TxType>,
        worker_id: WorkerId,
        error: String,
    },
    BridgeTransactionCompleted {
        id: BridgeTxId,
    },
    BridgeTransactionFailed {
        id: BridgeTxId,
        reason: String,
    },
    BridgeTransactionRetrying {
        id: BridgeTxId,
        attempt: u32,
        delay_ms: u64,
    },
    BridgeTransactionTimedOut {
        id: BridgeTxId,
    },
    BridgeTransactionCancelled {
        id: BridgeTxId,
    },
    BridgeTransactionRetried {
        id: BridgeTxId,
    },
    CircuitBreakerOpen,
    CircuitBreakerHalfOpen,
    CircuitBreakerClosed,
    Stats(Arc<str>),
}

/// A cloneable publishing handle. Cloning an `EventSink` shares the same
/// underlying channel; it is cheap and safe to hand to every engine.
#[derive(Clone)]
pub struct EventSink(broadcast::Sender<Event>);

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self(tx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.0.subscribe()
    }

    /// Publishes an event. Dropped silently if there are no subscribers,
    /// matching `tokio::sync::broadcast`'s semantics — engines never block
    /// or fail because nobody is listening.
    pub fn publish(&self, event: Event) {
        let _ = self.0.send(event);
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(1024)
    }
}
