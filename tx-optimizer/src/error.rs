use sequencer_types::TxType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transaction type {0} is not supported by this optimizer")]
    UnsupportedType(TxType),
    #[error("queue for type {0} is full")]
    QueueFull(TxType),
}

pub type Result<T> = std::result::Result<T, Error>;
