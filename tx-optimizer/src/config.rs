use sequencer_types::TxType;
use serde::Deserialize;

/// Mixed-Transaction Optimizer configuration, per the "Optimizer" option
/// list in the external-interfaces contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workers_per_type: usize,
    pub max_queue_size_per_type: usize,
    pub processing_interval_ms: u64,
    pub transaction_timeout_ms: u64,
    pub waiting_priority_factor: f64,
    pub enable_adaptive_load_balancing: bool,
    pub adaptive_load_balancing_interval_ms: u64,
    pub adaptive_load_balancing_factor: f64,
    pub supported_transaction_types: Vec<TxType>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers_per_type: 2,
            max_queue_size_per_type: 1_000,
            processing_interval_ms: 100,
            transaction_timeout_ms: 30_000,
            waiting_priority_factor: 2.0,
            enable_adaptive_load_balancing: true,
            adaptive_load_balancing_interval_ms: 5_000,
            adaptive_load_balancing_factor: 0.5,
            supported_transaction_types: TxType::ALL.to_vec(),
        }
    }
}
