use crate::error::Result;
use crate::types::{StateRoot, RECORD_LEN};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// The durable backing store named as a collaborator in the external
/// interfaces contract. `append` must not return until the record is
/// durable; `load_all` must tolerate and skip zero-root records.
pub trait StateStore: Send + Sync {
    fn load_all(&mut self) -> Result<Vec<StateRoot>>;
    fn append(&mut self, entry: &StateRoot) -> Result<()>;
}

/// Append-only file of fixed-width 48-byte records, `fsync`-ed after every
/// write so a crash can lose at most the in-flight append, never corrupt a
/// previously-committed one.
pub struct FileStateStore {
    file: File,
}

impl FileStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).read(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl StateStore for FileStateStore {
    fn load_all(&mut self) -> Result<Vec<StateRoot>> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf)?;
        if buf.len() % RECORD_LEN != 0 {
            return Err(crate::error::Error::Corrupt(format!("state log length {} is not a multiple of {RECORD_LEN}", buf.len())));
        }
        let mut out = Vec::with_capacity(buf.len() / RECORD_LEN);
        for chunk in buf.chunks_exact(RECORD_LEN) {
            let record: [u8; RECORD_LEN] = chunk.try_into().unwrap();
            if let Some(root) = StateRoot::from_record(&record) {
                out.push(root);
            }
        }
        Ok(out)
    }

    fn append(&mut self, entry: &StateRoot) -> Result<()> {
        self.file.write_all(&entry.to_record())?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

/// Backing store for tests: an in-process `Vec`, no filesystem involved.
#[derive(Default)]
pub struct InMemoryStateStore {
    entries: Vec<StateRoot>,
}

impl StateStore for InMemoryStateStore {
    fn load_all(&mut self) -> Result<Vec<StateRoot>> {
        Ok(self.entries.clone())
    }

    fn append(&mut self, entry: &StateRoot) -> Result<()> {
        self.entries.push(*entry);
        Ok(())
    }
}
