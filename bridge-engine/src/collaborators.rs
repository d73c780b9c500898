use crate::types::BridgeTx;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ExecError {
    pub message: String,
    pub code: Option<String>,
    pub details: Option<String>,
    pub recoverable: bool,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub hash: Option<String>,
    pub error: Option<ExecError>,
}

/// Performs one attempt at moving a bridge transaction toward its
/// destination chain. Registered per `BridgeTxType`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, tx: &BridgeTx, attempt: u32) -> ExecutionOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub status: VerificationStatus,
    pub destination_hash: Option<String>,
    pub error: Option<ExecError>,
}

/// Polls for confirmation that a previously executed bridge transaction has
/// landed on its destination. Registered per `BridgeTxType`.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, tx: &BridgeTx) -> VerificationOutcome;
}
