use sequencer_types::BundleId;
use thiserror::Error;

/// Validation failures are returned synchronously to callers; every other
/// failure kind (transient/permanent execution, timeout, resource, protocol)
/// is observable only through events and status queries, per the
/// propagation policy.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bundle {0} not found")]
    UnknownBundle(BundleId),
    #[error("bundle {0} is not pending")]
    NotPending(BundleId),
    #[error("bundle {0} would exceed the transaction-count cap")]
    BundleFull(BundleId),
    #[error("bundle {0} would exceed the gas cap")]
    GasCapExceeded(BundleId),
    #[error("transaction type is not supported by this bundle")]
    UnsupportedType,
    #[error("bundle {0} is not queued or is empty")]
    NotDispatchable(BundleId),
    #[error("bundle {0} cannot be aborted from its current state")]
    NotAbortable(BundleId),
    #[error("tax system error: {0}")]
    Tax(String),
    #[error("worker error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, Error>;
