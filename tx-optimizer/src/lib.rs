pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod worker;

pub use config::Config;
pub use engine::Optimizer;
pub use error::{Error, Result};
pub use metrics::{ProcessingMetricsSnapshot, QueueStatus, WorkerStatus};
pub use queue::QueuedTransaction;
pub use worker::{OptimizerWorker, TxWorkResult};

#[cfg(test)]
mod tests;
