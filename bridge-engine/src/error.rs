use sequencer_types::BridgeTxId;
use thiserror::Error;

use crate::types::BridgeTxType;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown bridge transaction {0}")]
    UnknownTransaction(BridgeTxId),
    #[error("bridge transaction {0} is already in a terminal state")]
    NotCancellable(BridgeTxId),
    #[error("no executor registered for type {0}")]
    NoExecutor(BridgeTxType),
    #[error("no verifier registered for type {0}")]
    NoVerifier(BridgeTxType),
}

pub type Result<T> = std::result::Result<T, Error>;
