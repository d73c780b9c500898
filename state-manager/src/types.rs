/// A single committed L2 state root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateRoot {
    pub root: [u8; 32],
    pub block_number: u64,
    pub timestamp: u64,
}

pub const RECORD_LEN: usize = 32 + 8 + 8;

impl StateRoot {
    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        buf[0..32].copy_from_slice(&self.root);
        buf[32..40].copy_from_slice(&self.block_number.to_le_bytes());
        buf[40..48].copy_from_slice(&self.timestamp.to_le_bytes());
        buf
    }

    /// Returns `None` for an all-zero root, which readers must tolerate and
    /// skip rather than treat as a valid entry.
    pub fn from_record(buf: &[u8; RECORD_LEN]) -> Option<Self> {
        let mut root = [0u8; 32];
        root.copy_from_slice(&buf[0..32]);
        if root == [0u8; 32] {
            return None;
        }
        let block_number = u64::from_le_bytes(buf[32..40].try_into().unwrap());
        let timestamp = u64::from_le_bytes(buf[40..48].try_into().unwrap());
        Some(Self { root, block_number, timestamp })
    }
}
