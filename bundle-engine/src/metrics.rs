use sequencer_types::TxType;
use std::collections::HashMap;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct TypeStats {
    pub submitted: u64,
    pub confirmed: u64,
    pub failed: u64,
}

/// Rolling counters and the per-type breakdown surfaced by
/// `get_performance_metrics`.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub bundles_completed: u64,
    pub bundles_failed: u64,
    pub bundles_expired: u64,
    pub bundles_aborted: u64,
    pub transactions_confirmed: u64,
    pub transactions_failed: u64,
    pub transactions_retried: u64,
    pub per_type: HashMap<TxType, TypeStats>,
    /// (timestamp_ms, tx_count) samples for the rolling TPS window.
    completions: VecDeque<(u64, usize)>,
}

const TPS_WINDOW_MS: u64 = 10_000;

impl Metrics {
    pub fn record_bundle_completion(&mut self, now_ms: u64, tx_count: usize) {
        self.completions.push_back((now_ms, tx_count));
        while let Some(&(ts, _)) = self.completions.front() {
            if now_ms.saturating_sub(ts) > TPS_WINDOW_MS {
                self.completions.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn rolling_tps(&self, now_ms: u64) -> f64 {
        let total: usize = self
            .completions
            .iter()
            .filter(|&&(ts, _)| now_ms.saturating_sub(ts) <= TPS_WINDOW_MS)
            .map(|&(_, n)| n)
            .sum();
        total as f64 / (TPS_WINDOW_MS as f64 / 1000.0)
    }

    pub fn record_tx(&mut self, tx_type: TxType, confirmed: bool) {
        let entry = self.per_type.entry(tx_type).or_default();
        entry.submitted += 1;
        if confirmed {
            entry.confirmed += 1;
            self.transactions_confirmed += 1;
        } else {
            entry.failed += 1;
            self.transactions_failed += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceSnapshot {
    pub since_ms: u64,
    pub bundles_completed: u64,
    pub bundles_failed: u64,
    pub bundles_expired: u64,
    pub bundles_aborted: u64,
    pub transactions_confirmed: u64,
    pub transactions_failed: u64,
    pub transactions_retried: u64,
    pub rolling_tps: f64,
    pub per_type: HashMap<TxType, TypeStats>,
    pub bundle_size_multiplier: f64,
    pub gas_limit_multiplier: f64,
}
