use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("state root log is empty")]
    EmptyLog,
    #[error("block number {0} already has a committed state root")]
    DuplicateBlockNumber(u64),
    #[error("state store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state store record is corrupt: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;
