use crate::ids::TxId;
use crate::money::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of transaction types the sequencer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Buy,
    Sell,
    Transfer,
    Swap,
    Deposit,
    Withdraw,
    Other,
}

impl TxType {
    pub const ALL: [TxType; 7] = [
        TxType::Buy,
        TxType::Sell,
        TxType::Transfer,
        TxType::Swap,
        TxType::Deposit,
        TxType::Withdraw,
        TxType::Other,
    ];
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxType::Buy => "buy",
            TxType::Sell => "sell",
            TxType::Transfer => "transfer",
            TxType::Swap => "swap",
            TxType::Deposit => "deposit",
            TxType::Withdraw => "withdraw",
            TxType::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Processing,
    Confirmed,
    Failed,
    Retry,
}

/// A client-submitted transaction.
///
/// `payload` is treated as opaque bytes by every engine in this workspace;
/// only workers and external collaborators interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tx {
    pub id: TxId,
    pub sender: String,
    pub recipient: String,
    pub value: Amount,
    pub payload: Vec<u8>,
    pub gas_limit: u64,
    pub gas_price: Option<Amount>,
    pub tx_type: TxType,
    pub priority: f64,
    pub retry_count: u32,
    pub status: TxStatus,
    pub hash: Option<String>,
}

impl Tx {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        value: Amount,
        payload: Vec<u8>,
        gas_limit: u64,
        tx_type: TxType,
    ) -> Self {
        Self {
            id: TxId::new(),
            sender: sender.into(),
            recipient: recipient.into(),
            value,
            payload,
            gas_limit,
            gas_price: None,
            tx_type,
            priority: 1.0,
            retry_count: 0,
            status: TxStatus::Pending,
            hash: None,
        }
    }

    /// Canonical byte encoding used as input to state-root hashing.
    ///
    /// Fixed-width fields, length-prefixed variable fields, in declaration
    /// order. Deterministic for a given set of field values.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64 + self.payload.len());
        buf.extend_from_slice(self.id.to_string().as_bytes());
        buf.extend_from_slice(&(self.sender.len() as u32).to_be_bytes());
        buf.extend_from_slice(self.sender.as_bytes());
        buf.extend_from_slice(&(self.recipient.len() as u32).to_be_bytes());
        buf.extend_from_slice(self.recipient.as_bytes());
        let mut value_bytes = [0u8; 32];
        self.value.to_big_endian(&mut value_bytes);
        buf.extend_from_slice(&value_bytes);
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.gas_limit.to_be_bytes());
        buf
    }
}
