use crate::bundle::Bundle;

const BASELINE_TX_GAS: f64 = 21_000.0;

/// `score = 0.4*fullness + 0.3*avg_priority + 0.2*gas_efficiency + 0.1*type_diversity`,
/// each term scaled to `[0, 100]`.
pub fn optimization_score(bundle: &Bundle) -> f64 {
    let len = bundle.len();
    if len == 0 {
        return 0.0;
    }

    let fullness = (100.0 * len as f64 / bundle.effective_max_size as f64).min(100.0);

    let avg_priority = {
        let mean = bundle.transactions.iter().map(|tx| tx.priority).sum::<f64>() / len as f64;
        mean.min(100.0)
    };

    let gas_efficiency = if bundle.total_gas == 0 {
        0.0
    } else {
        (100.0 * (len as f64 * BASELINE_TX_GAS) / bundle.total_gas as f64).min(100.0)
    };

    let type_diversity = (33.33 * bundle.types_present.len() as f64).min(100.0);

    0.4 * fullness + 0.3 * avg_priority + 0.2 * gas_efficiency + 0.1 * type_diversity
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_types::{Amount, Tx, TxType};

    fn tx(gas: u64, priority: f64, tx_type: TxType) -> Tx {
        let mut tx = Tx::new("a", "b", Amount::zero(), vec![], gas, tx_type);
        tx.priority = priority;
        tx
    }

    #[test]
    fn empty_bundle_scores_zero() {
        let bundle = Bundle::new(0, 30, 1, 10, 1_000_000);
        assert_eq!(optimization_score(&bundle), 0.0);
    }

    #[test]
    fn full_diverse_bundle_scores_high() {
        let mut bundle = Bundle::new(0, 30, 1, 3, 63_000);
        for t in [TxType::Transfer, TxType::Transfer, TxType::Swap] {
            let tx = tx(21_000, 80.0, t);
            bundle.types_present.insert(t);
            bundle.transactions.push(tx);
        }
        bundle.recompute_total_gas();
        let score = optimization_score(&bundle);
        // fullness=100, avg_priority=80, gas_efficiency=100, type_diversity=66.66
        let expected = 0.4 * 100.0 + 0.3 * 80.0 + 0.2 * 100.0 + 0.1 * 66.66;
        assert!((score - expected).abs() < 0.01, "{score} vs {expected}");
    }
}
