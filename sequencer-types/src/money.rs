/// Arbitrary-precision non-negative integer used for transaction values,
/// bridge amounts, and tax amounts, matching the integer type family used
/// across the reth/ethereum Rust ecosystem.
pub type Amount = primitive_types::U256;
