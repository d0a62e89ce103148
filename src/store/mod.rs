//! Ordered byte-keyed storage contract and implementations
//!
//! The collection persists raw documents, id mappings and its sequence
//! counter through this trait. Keys are ASCII with one binary tail (the
//! big-endian seq id), so lexicographic key order matches numeric order
//! and prefix scans yield documents in insertion order.

mod counter;
mod fjall;
pub mod keys;
mod memory;

pub use counter::SequenceCounter;
pub use memory::MemoryStore;
pub use self::fjall::FjallStore;

use crate::error::Result;

/// Ordered persistent key-value map
///
/// `get` distinguishes found from not-found via `Option`; storage failures
/// surface as errors. `increment` maintains a decimal-ASCII counter with
/// create-if-absent semantics and returns the new value. `scan_prefix`
/// yields entries in ascending byte order of their keys.
pub trait Store: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn remove(&self, key: &[u8]) -> Result<()>;

    fn increment(&self, key: &[u8], delta: u64) -> Result<u64>;

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

pub(crate) fn parse_counter(bytes: &[u8]) -> u64 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0)
}
