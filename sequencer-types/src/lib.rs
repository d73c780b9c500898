pub mod clock;
pub mod events;
pub mod ids;
pub mod money;
pub mod priority;
pub mod tax;
pub mod tx;

pub use clock::{Clock, SystemClock, TestClock};
pub use events::{Event, EventSink};
pub use ids::{BridgeTxId, BundleId, TxId, WorkerId};
pub use money::Amount;
pub use priority::effective_priority;
pub use tax::TaxAmount;
pub use tx::{Tx, TxStatus, TxType};
