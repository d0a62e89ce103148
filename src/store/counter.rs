use super::{keys, parse_counter, Store};
use crate::error::Result;

/// The per-collection sequence id allocator
///
/// Seq ids are monotone and never reused, even across deletions. The
/// in-memory counter is authoritative for allocation; every allocation also
/// bumps the persisted `$CN` counter so a restarted process resumes past
/// every id it ever handed out.
#[derive(Debug)]
pub struct SequenceCounter {
    key: Vec<u8>,
    next: u32,
}

impl SequenceCounter {
    /// Start counting at `initial` for a fresh collection
    pub fn new(collection_name: &str, initial: u32) -> Self {
        Self {
            key: keys::next_seq_id_key(collection_name),
            next: initial,
        }
    }

    /// Resume from the persisted counter, defaulting to 0 when absent
    pub fn load(store: &dyn Store, collection_name: &str) -> Result<Self> {
        let key = keys::next_seq_id_key(collection_name);
        let next = match store.get(&key)? {
            Some(bytes) => parse_counter(&bytes) as u32,
            None => 0,
        };
        Ok(Self { key, next })
    }

    /// Allocate the next seq id, bumping the persisted counter
    pub fn next(&mut self, store: &dyn Store) -> Result<u32> {
        store.increment(&self.key, 1)?;
        let seq_id = self.next;
        self.next += 1;
        Ok(seq_id)
    }

    /// The id the next allocation will return
    pub fn peek(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_allocation_is_monotone() {
        let store = MemoryStore::new();
        let mut counter = SequenceCounter::new("books", 0);

        assert_eq!(counter.next(&store).unwrap(), 0);
        assert_eq!(counter.next(&store).unwrap(), 1);
        assert_eq!(counter.next(&store).unwrap(), 2);
        assert_eq!(counter.peek(), 3);
    }

    #[test]
    fn test_persisted_counter_tracks_allocations() {
        let store = MemoryStore::new();
        let mut counter = SequenceCounter::new("books", 0);
        for _ in 0..5 {
            counter.next(&store).unwrap();
        }

        let value = store.get(&keys::next_seq_id_key("books")).unwrap().unwrap();
        assert_eq!(value, b"5");
    }

    #[test]
    fn test_load_resumes_past_allocated_ids() {
        let store = MemoryStore::new();
        let mut counter = SequenceCounter::new("books", 0);
        for _ in 0..3 {
            counter.next(&store).unwrap();
        }

        let mut resumed = SequenceCounter::load(&store, "books").unwrap();
        assert_eq!(resumed.next(&store).unwrap(), 3);
    }

    #[test]
    fn test_load_defaults_to_zero() {
        let store = MemoryStore::new();
        let counter = SequenceCounter::load(&store, "empty").unwrap();
        assert_eq!(counter.peek(), 0);
    }
}
