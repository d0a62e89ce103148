use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};

use super::{parse_counter, Store};
use crate::error::{Result, ShoalError};

const DATA_PARTITION: &str = "collections";

/// Fjall-backed durable store
///
/// One partition holds every key class; the key layout in [`super::keys`]
/// keeps the classes disjoint. Counter updates are read-modify-write, which
/// is safe because ingestion is serialized per collection.
pub struct FjallStore {
    _keyspace: Keyspace,
    data: PartitionHandle,
}

impl FjallStore {
    /// Open (or create) a store under `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let keyspace = Config::new(path)
            .open()
            .map_err(|e| ShoalError::Store(format!("failed to open keyspace: {}", e)))?;
        let data = keyspace
            .open_partition(DATA_PARTITION, PartitionCreateOptions::default())
            .map_err(|e| ShoalError::Store(format!("failed to open partition: {}", e)))?;
        Ok(Self {
            _keyspace: keyspace,
            data,
        })
    }
}

impl Store for FjallStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .data
            .get(key)
            .map_err(|e| ShoalError::Store(e.to_string()))?;
        Ok(value.map(|slice| slice.to_vec()))
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data
            .insert(key, value)
            .map_err(|e| ShoalError::Store(e.to_string()))
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.data
            .remove(key)
            .map_err(|e| ShoalError::Store(e.to_string()))
    }

    fn increment(&self, key: &[u8], delta: u64) -> Result<u64> {
        let current = self.get(key)?.map(|v| parse_counter(&v)).unwrap_or(0);
        let next = current + delta;
        self.insert(key, next.to_string().as_bytes())?;
        Ok(next)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        for item in self.data.prefix(prefix) {
            let (key, value) = item.map_err(|e| ShoalError::Store(e.to_string()))?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}
