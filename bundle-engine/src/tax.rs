use async_trait::async_trait;
use sequencer_types::{Amount, TaxAmount, Tx, TxType};

/// The tax-system collaborator. Out of scope per the purpose statement;
/// only the interface the Bundle Engine consumes is specified here.
#[async_trait]
pub trait TaxSystem: Send + Sync {
    async fn calculate_tax(&self, tx: &Tx, tx_type: TxType) -> TaxAmount;
    async fn apply_taxes(&self, tx: &Tx, tx_type: TxType) -> Tx;
    async fn execute_burn(&self, amount: Amount) -> Result<(), String>;
    async fn execute_buyback(&self, amount: Amount) -> Result<(), String>;
    async fn distribute_taxes(&self, liquidity: Amount, marketing: Amount, development: Amount) -> Result<(), String>;
}

/// A fixed-rate tax system used where no bespoke collaborator is wired in
/// (default wiring, and tests). Splits a flat basis-point rate of `value`
/// across the five components.
pub struct FixedRateTaxSystem {
    pub rate_bps: u64,
}

impl FixedRateTaxSystem {
    pub fn new(rate_bps: u64) -> Self {
        Self { rate_bps }
    }
}

#[async_trait]
impl TaxSystem for FixedRateTaxSystem {
    async fn calculate_tax(&self, tx: &Tx, _tx_type: TxType) -> TaxAmount {
        let total = tx.value * Amount::from(self.rate_bps) / Amount::from(10_000u64);
        let share = total / Amount::from(5u64);
        let remainder = total - share * Amount::from(4u64);
        TaxAmount::new(share, share, share, share, remainder)
    }

    async fn apply_taxes(&self, tx: &Tx, tx_type: TxType) -> Tx {
        let tax = self.calculate_tax(tx, tx_type).await;
        let mut taxed = tx.clone();
        taxed.value = taxed.value.saturating_sub(tax.total);
        taxed
    }

    async fn execute_burn(&self, _amount: Amount) -> Result<(), String> {
        Ok(())
    }

    async fn execute_buyback(&self, _amount: Amount) -> Result<(), String> {
        Ok(())
    }

    async fn distribute_taxes(&self, _liquidity: Amount, _marketing: Amount, _development: Amount) -> Result<(), String> {
        Ok(())
    }
}
