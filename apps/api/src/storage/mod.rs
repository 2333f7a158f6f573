//! Local key-value persistence for settings and history.
//!
//! Callers see only the `KeyValueStore` capability; `SledStore` is the embedded
//! implementation. Values are opaque bytes; typed layers live in `settings`
//! and `history`.

use std::path::Path;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Backend(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt key: {0}")]
    CorruptKey(String),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Removes every entry under `prefix`, returning how many were removed.
    fn clear_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let entries = self.scan_prefix(prefix)?;
        for (key, _) in &entries {
            self.remove(key)?;
        }
        Ok(entries.len())
    }

    /// Monotonically increasing id, unique for the lifetime of the store.
    fn next_id(&self) -> Result<u64, StoreError>;
}

/// Sled-backed store.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Opens (or creates) the database directory at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        info!("Local store opened at {}", path.as_ref().display());
        Ok(Self { db })
    }

    /// In-memory database removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.db.remove(key.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        self.db
            .scan_prefix(prefix.as_bytes())
            .map(|item| {
                let (k, v) = item?;
                let key = String::from_utf8(k.to_vec())
                    .map_err(|e| StoreError::CorruptKey(e.to_string()))?;
                Ok((key, v.to_vec()))
            })
            .collect()
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        Ok(self.db.generate_id()?)
    }
}
