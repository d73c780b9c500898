use serde::Deserialize;

/// Bundle Engine configuration, per the "Bundle Engine" option list in the
/// external-interfaces contract. Deserializable from the top-level TOML
/// configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_transactions_per_bundle: usize,
    pub max_gas_per_bundle: u64,
    pub timeout_seconds: u64,
    pub priority_fee: u64,
    pub worker_threads: usize,
    pub max_concurrent_bundles: usize,
    pub use_adaptive_bundling: bool,
    pub processing_interval_ms: u64,
    pub max_transaction_retries: u32,
    pub transaction_retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_transactions_per_bundle: 200,
            max_gas_per_bundle: 15_000_000,
            timeout_seconds: 30,
            priority_fee: 1,
            worker_threads: 4,
            max_concurrent_bundles: 4,
            use_adaptive_bundling: true,
            processing_interval_ms: 250,
            max_transaction_retries: 3,
            transaction_retry_delay_ms: 500,
        }
    }
}

/// The adaptive multipliers applied to the configured caps to produce the
/// *effective* caps used by bundles created from this point forward.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveMultipliers {
    pub bundle_size: f64,
    pub gas_limit: f64,
}

impl Default for AdaptiveMultipliers {
    fn default() -> Self {
        Self { bundle_size: 1.0, gas_limit: 1.0 }
    }
}

impl AdaptiveMultipliers {
    pub const MIN: f64 = 0.5;
    pub const MAX: f64 = 1.5;

    pub fn grow_size(&mut self) {
        self.bundle_size = (self.bundle_size * 1.05).min(Self::MAX);
    }

    pub fn shrink_size(&mut self) {
        self.bundle_size = (self.bundle_size * 0.95).max(Self::MIN);
    }

    pub fn grow_gas(&mut self) {
        self.gas_limit = (self.gas_limit * 1.05).min(Self::MAX);
    }

    pub fn shrink_gas(&mut self) {
        self.gas_limit = (self.gas_limit * 0.95).max(Self::MIN);
    }
}
