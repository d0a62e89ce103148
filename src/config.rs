/// Tunables for a collection
///
/// `num_shards` is fixed for the lifetime of a collection: the shard an
/// ingested document lands on is `seq_id % num_shards`, so changing it
/// would require a full reindex.
#[derive(Clone, Debug)]
pub struct CollectionSettings {
    /// Number of independent index shards
    pub num_shards: usize,
    /// Upper bound on `page * per_page` for any search
    pub max_results: usize,
    /// Per-shard, per-field bounded top-K capacity
    pub topster_capacity: usize,
    /// Field length (in tokens) above which highlight snippets are windowed
    pub snippet_threshold: usize,
    /// Maximum fuzzy variants considered per query token
    pub max_candidates: usize,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            num_shards: 4,
            max_results: 500,
            topster_capacity: 100,
            snippet_threshold: 30,
            max_candidates: 50,
        }
    }
}

impl CollectionSettings {
    /// Set the shard count
    pub fn with_num_shards(mut self, num_shards: usize) -> Self {
        self.num_shards = num_shards.max(1);
        self
    }

    /// Set the pagination ceiling
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CollectionSettings::default();
        assert_eq!(settings.num_shards, 4);
        assert_eq!(settings.max_results, 500);
        assert_eq!(settings.topster_capacity, 100);
        assert_eq!(settings.snippet_threshold, 30);
    }

    #[test]
    fn test_builder() {
        let settings = CollectionSettings::default()
            .with_num_shards(0)
            .with_max_results(50);
        assert_eq!(settings.num_shards, 1);
        assert_eq!(settings.max_results, 50);
    }
}
