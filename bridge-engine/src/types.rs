use sequencer_types::{Amount, BridgeTxId};
use std::fmt;

/// Identifies which registered executor/verifier pair handles a bridge
/// transaction — e.g. a route or asset class. Opaque to the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BridgeTxType(pub String);

impl fmt::Display for BridgeTxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BridgeTxType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeTxStatus {
    Pending,
    InProgress,
    Retrying,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl BridgeTxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled)
    }
}

/// One recorded executor/verifier failure. Pushed, never overwritten — see
/// `BridgeTx::errors`.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub message: String,
    pub code: Option<String>,
    pub details: Option<String>,
    pub recoverable: bool,
    pub at_ms: u64,
}

/// A single bridge transaction and its state-machine bookkeeping.
#[derive(Debug, Clone)]
pub struct BridgeTx {
    pub id: BridgeTxId,
    pub tx_type: BridgeTxType,
    pub source_chain: String,
    pub source_address: String,
    pub destination_chain: String,
    pub destination_address: String,
    pub token: String,
    pub amount: Amount,
    pub status: BridgeTxStatus,
    pub attempts: u32,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub next_retry_at_ms: Option<u64>,
    /// Ordered error history, oldest first. Appended to on every failure,
    /// never overwritten.
    pub errors: Vec<ErrorRecord>,
    pub source_hash: Option<String>,
    pub destination_hash: Option<String>,
}

impl BridgeTx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx_type: BridgeTxType,
        source_chain: impl Into<String>,
        source_address: impl Into<String>,
        destination_chain: impl Into<String>,
        destination_address: impl Into<String>,
        token: impl Into<String>,
        amount: Amount,
        now_ms: u64,
    ) -> Self {
        Self {
            id: BridgeTxId::new(),
            tx_type,
            source_chain: source_chain.into(),
            source_address: source_address.into(),
            destination_chain: destination_chain.into(),
            destination_address: destination_address.into(),
            token: token.into(),
            amount,
            status: BridgeTxStatus::Pending,
            attempts: 0,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            completed_at_ms: None,
            next_retry_at_ms: None,
            errors: Vec::new(),
            source_hash: None,
            destination_hash: None,
        }
    }
}
