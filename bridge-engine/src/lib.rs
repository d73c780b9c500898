pub mod backoff;
pub mod circuit_breaker;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use collaborators::{ExecError, ExecutionOutcome, Executor, VerificationOutcome, VerificationStatus, Verifier};
pub use config::Config;
pub use engine::BridgeEngine;
pub use error::{Error, Result};
pub use types::{BridgeTx, BridgeTxStatus, BridgeTxType, ErrorRecord};

#[cfg(test)]
mod tests;
