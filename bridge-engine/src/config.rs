use serde::Deserialize;

/// Bridge Reliability Engine configuration.
///
/// `monitoring_interval_ms` is not part of that closed set — it governs only
/// the cadence of the circuit-breaker/stats monitoring tick, an ambient
/// observability concern rather than a processing feature — but is honored
/// by `update_config` exactly as `transaction_check_interval_ms` is.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub retry_backoff_factor: f64,
    pub max_retry_delay_ms: u64,
    pub transaction_timeout_ms: u64,
    pub transaction_check_interval_ms: u64,
    pub monitoring_interval_ms: u64,
    pub circuit_breaker_error_threshold: usize,
    pub circuit_breaker_window_ms: u64,
    pub circuit_breaker_reset_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_retry_delay_ms: 1_000,
            retry_backoff_factor: 2.0,
            max_retry_delay_ms: 60_000,
            transaction_timeout_ms: 120_000,
            transaction_check_interval_ms: 5_000,
            monitoring_interval_ms: 5_000,
            circuit_breaker_error_threshold: 5,
            circuit_breaker_window_ms: 60_000,
            circuit_breaker_reset_ms: 30_000,
        }
    }
}
