use crate::money::Amount;
use serde::{Deserialize, Serialize};

/// Six non-negative components of tax levied on a transaction.
///
/// Invariant: `total == liquidity + marketing + development + burn + buyback`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAmount {
    pub total: Amount,
    pub liquidity: Amount,
    pub marketing: Amount,
    pub development: Amount,
    pub burn: Amount,
    pub buyback: Amount,
}

impl TaxAmount {
    pub fn new(
        liquidity: Amount,
        marketing: Amount,
        development: Amount,
        burn: Amount,
        buyback: Amount,
    ) -> Self {
        let total = liquidity + marketing + development + burn + buyback;
        Self { total, liquidity, marketing, development, burn, buyback }
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.liquidity + self.marketing + self.development + self.burn + self.buyback
    }

    pub fn checked_add(&self, other: &TaxAmount) -> Self {
        Self {
            total: self.total + other.total,
            liquidity: self.liquidity + other.liquidity,
            marketing: self.marketing + other.marketing,
            development: self.development + other.development,
            burn: self.burn + other.burn,
            buyback: self.buyback + other.buyback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_matches_components() {
        let tax = TaxAmount::new(1u64.into(), 2u64.into(), 3u64.into(), 4u64.into(), 5u64.into());
        assert_eq!(tax.total, Amount::from(15u64));
        assert!(tax.is_consistent());
    }

    #[test]
    fn accumulation_preserves_invariant() {
        let a = TaxAmount::new(1u64.into(), 0u64.into(), 0u64.into(), 0u64.into(), 0u64.into());
        let b = TaxAmount::new(0u64.into(), 2u64.into(), 0u64.into(), 0u64.into(), 0u64.into());
        let sum = a.checked_add(&b);
        assert!(sum.is_consistent());
        assert_eq!(sum.total, Amount::from(3u64));
    }
}
