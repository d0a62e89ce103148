use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{parse_counter, Store};
use crate::error::Result;

/// In-memory ordered store
///
/// A `BTreeMap` keeps keys byte-ordered, which makes `scan_prefix` behave
/// exactly like the durable implementation. Intended for tests and
/// ephemeral collections.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        self.inner.write().remove(key);
        Ok(())
    }

    fn increment(&self, key: &[u8], delta: u64) -> Result<u64> {
        let mut inner = self.inner.write();
        let current = inner.get(key).map(|v| parse_counter(v)).unwrap_or(0);
        let next = current + delta;
        inner.insert(key.to_vec(), next.to_string().into_bytes());
        Ok(next)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let inner = self.inner.read();
        Ok(inner
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
