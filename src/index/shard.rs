//! One index shard
//!
//! A shard owns a token trie per searchable string field, forward value
//! maps for filters and facets, sort-key maps, and the live-id set. The
//! collection routes each document to shard `seq_id % num_shards` and fans
//! searches out to every shard.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use roaring::RoaringBitmap;
use serde_json::{Map, Value};

use super::match_score::MatchScore;
use super::topster::{Topster, TopsterEntry};
use super::trie::{FuzzyMatch, Trie};
use crate::index::encode_float_order;
use crate::models::{FilterClause, FilterValue, TokenOrder};
use crate::schema::{FieldType, Schema};
use crate::tokenizer;

/// Forward values of one field for one document
#[derive(Clone, Debug, PartialEq)]
enum FieldValues {
    Strings(Vec<String>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

/// The trie leaves one query plan touched, kept for highlight recovery
#[derive(Clone, Debug)]
pub struct SearchedQuery {
    pub field: String,
    pub tokens: Vec<String>,
}

/// Call-owned buffers every shard merges its results into
#[derive(Debug, Default)]
pub struct SearchAccumulators {
    /// `(reverse_field_order_index, entry)` pairs from every shard topster
    pub field_order_entries: Vec<(usize, TopsterEntry)>,
    /// Union-of-ids cardinality across shards and plans
    pub total_matched: u64,
    /// One entry per executed query plan, indexed by `query_index`
    pub searched_queries: Vec<SearchedQuery>,
    /// Per facet field, matched-value counts
    pub facet_counts: HashMap<String, HashMap<String, u64>>,
}

/// Validated, shard-ready search parameters
#[derive(Debug)]
pub struct SearchParams<'a> {
    /// Tokenized query; empty means match-all (the collection pushes the
    /// shared empty plan at `searched_queries[0]` in that case)
    pub tokens: &'a [String],
    pub search_fields: &'a [String],
    pub filters: &'a [FilterClause],
    pub facet_fields: &'a [String],
    /// `(name, descending)` pairs, already case-folded
    pub sort_fields: &'a [(String, bool)],
    pub num_typos: usize,
    pub token_order: TokenOrder,
    pub prefix: bool,
    /// Rank by token-ranking points when no sort fields were given
    pub use_points: bool,
    pub max_candidates: usize,
    pub topster_capacity: usize,
}

/// One of the collection's independent index partitions
#[derive(Debug)]
pub struct IndexShard {
    schema: Arc<Schema>,
    search_index: HashMap<String, Trie>,
    forward_index: HashMap<String, HashMap<u32, FieldValues>>,
    sort_index: HashMap<String, HashMap<u32, i64>>,
    points_index: HashMap<u32, i64>,
    live_ids: RoaringBitmap,
}

impl IndexShard {
    pub fn new(schema: Arc<Schema>) -> Self {
        let mut search_index = HashMap::new();
        let mut forward_index = HashMap::new();
        let mut sort_index = HashMap::new();

        for (name, field) in schema.search_schema() {
            if field.field_type.is_string_like() {
                search_index.insert(name.clone(), Trie::new());
            }
            forward_index.insert(name.clone(), HashMap::new());
        }
        for name in schema.sort_schema().keys() {
            sort_index.insert(name.clone(), HashMap::new());
        }

        Self {
            schema,
            search_index,
            forward_index,
            sort_index,
            points_index: HashMap::new(),
            live_ids: RoaringBitmap::new(),
        }
    }

    /// Number of live documents in this shard
    pub fn num_docs(&self) -> u64 {
        self.live_ids.len()
    }

    /// Insert a validated document
    pub fn index(&mut self, document: &Map<String, Value>, seq_id: u32, points: i64) {
        let schema = Arc::clone(&self.schema);
        for (name, field) in schema.search_schema() {
            let Some(value) = document.get(name) else {
                continue;
            };

            if field.field_type.is_string_like() {
                let positions = string_positions(field.field_type, value);
                if let Some(trie) = self.search_index.get_mut(name) {
                    for (token, token_positions) in &positions {
                        trie.insert(token.as_bytes(), seq_id, token_positions, points);
                    }
                }
            }

            if let Some(forward) = self.forward_index.get_mut(name) {
                forward.insert(seq_id, field_values(field.field_type, value));
            }

            if let Some(sort_map) = self.sort_index.get_mut(name) {
                sort_map.insert(seq_id, sort_key(field.field_type, value));
            }
        }

        self.points_index.insert(seq_id, points);
        self.live_ids.insert(seq_id);
    }

    /// Remove a document; a no-op when the shard never held it
    pub fn remove(&mut self, seq_id: u32, document: &Map<String, Value>) {
        if !self.live_ids.contains(seq_id) {
            return;
        }

        let schema = Arc::clone(&self.schema);
        for (name, field) in schema.search_schema() {
            if field.field_type.is_string_like() {
                if let (Some(value), Some(trie)) =
                    (document.get(name), self.search_index.get_mut(name))
                {
                    for token in string_tokens(field.field_type, value) {
                        trie.remove_doc(token.as_bytes(), seq_id);
                    }
                }
            }
            if let Some(forward) = self.forward_index.get_mut(name) {
                forward.remove(&seq_id);
            }
            if let Some(sort_map) = self.sort_index.get_mut(name) {
                sort_map.remove(&seq_id);
            }
        }

        self.points_index.remove(&seq_id);
        self.live_ids.remove(seq_id);
    }

    /// Run one search over this shard, merging into `acc`
    pub fn search(&self, params: &SearchParams<'_>, acc: &mut SearchAccumulators) {
        let matched = if params.tokens.is_empty() {
            self.search_match_all(params, acc)
        } else {
            self.search_tokens(params, acc)
        };

        acc.total_matched += matched.len();

        for facet_field in params.facet_fields {
            let forward = self.forward_index.get(facet_field);
            let counts = acc.facet_counts.entry(facet_field.clone()).or_default();
            for seq_id in matched.iter() {
                if let Some(FieldValues::Strings(values)) = forward.and_then(|m| m.get(&seq_id)) {
                    for value in values {
                        *counts.entry(value.clone()).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    /// Positions of `term` in `seq_id`'s `field`, straight from the trie
    pub fn leaf_positions(&self, field: &str, term: &str, seq_id: u32) -> Option<Vec<u16>> {
        self.search_index
            .get(field)?
            .get(term.as_bytes())?
            .positions_of(seq_id)
            .map(|positions| positions.to_vec())
    }

    /// Whether a term is still present in a field's trie
    pub fn contains_term(&self, field: &str, term: &str) -> bool {
        self.search_index
            .get(field)
            .and_then(|trie| trie.get(term.as_bytes()))
            .is_some()
    }

    fn search_match_all(
        &self,
        params: &SearchParams<'_>,
        acc: &mut SearchAccumulators,
    ) -> RoaringBitmap {
        let mut matched = self.live_ids.clone();
        self.apply_filters(&mut matched, params.filters);

        let mut topster = Topster::new(params.topster_capacity);
        for seq_id in matched.iter() {
            let (primary_attr, secondary_attr) = self.sort_attrs(seq_id, params);
            topster.add(TopsterEntry {
                key: seq_id,
                query_index: 0,
                match_score: 0,
                primary_attr,
                secondary_attr,
            });
        }
        for entry in topster.into_entries() {
            acc.field_order_entries
                .push((params.search_fields.len(), entry));
        }
        matched
    }

    fn search_tokens(
        &self,
        params: &SearchParams<'_>,
        acc: &mut SearchAccumulators,
    ) -> RoaringBitmap {
        let mut shard_matched = RoaringBitmap::new();
        let mut topster = Topster::new(params.topster_capacity);
        // the field whose plan produced each retained entry
        let mut entry_fields: HashMap<u32, usize> = HashMap::new();

        for (field_position, field_name) in params.search_fields.iter().enumerate() {
            let Some(trie) = self.search_index.get(field_name) else {
                continue;
            };

            // relax the per-token cost budget, then drop trailing tokens,
            // until some plan matches at least one document
            let mut plan = None;
            let mut active = params.tokens.len();
            'relax: while active > 0 {
                for cost in 0..=params.num_typos {
                    if let Some((ids, per_token)) =
                        self.plan_candidates(trie, &params.tokens[..active], cost, params)
                    {
                        let mut ids = ids;
                        self.apply_filters(&mut ids, params.filters);
                        if !ids.is_empty() {
                            plan = Some((ids, per_token));
                            break 'relax;
                        }
                    }
                }
                active -= 1;
            }

            let Some((ids, per_token)) = plan else {
                continue;
            };

            let query_index = acc.searched_queries.len() as u32;
            acc.searched_queries.push(SearchedQuery {
                field: field_name.clone(),
                tokens: per_token
                    .iter()
                    .flatten()
                    .map(|m| String::from_utf8_lossy(&m.term).into_owned())
                    .collect(),
            });

            let reverse_field_order = params.search_fields.len() - field_position;
            for seq_id in ids.iter() {
                let token_positions: Vec<Vec<u16>> = per_token
                    .iter()
                    .map(|candidates| {
                        let mut positions = Vec::new();
                        for candidate in candidates {
                            if let Some(found) = candidate.postings.positions_of(seq_id) {
                                positions.extend_from_slice(found);
                            }
                        }
                        positions.sort_unstable();
                        positions
                    })
                    .collect();

                let match_score = MatchScore::compute(&token_positions);
                let (primary_attr, secondary_attr) = self.sort_attrs(seq_id, params);
                let kept = topster.add(TopsterEntry {
                    key: seq_id,
                    query_index,
                    match_score: match_score.score(),
                    primary_attr,
                    secondary_attr,
                });
                if kept {
                    entry_fields.insert(seq_id, reverse_field_order);
                }
            }

            shard_matched |= ids;
        }

        for entry in topster.into_entries() {
            let reverse_field_order = entry_fields
                .get(&entry.key)
                .copied()
                .unwrap_or(params.search_fields.len());
            acc.field_order_entries.push((reverse_field_order, entry));
        }

        shard_matched
    }

    /// Candidates per token at one cost budget, with their intersection
    ///
    /// Returns `None` when some token has no candidate or the intersection
    /// is empty, so the caller keeps relaxing.
    fn plan_candidates<'t>(
        &self,
        trie: &'t Trie,
        tokens: &[String],
        cost: usize,
        params: &SearchParams<'_>,
    ) -> Option<(RoaringBitmap, Vec<Vec<FuzzyMatch<'t>>>)> {
        let mut per_token = Vec::with_capacity(tokens.len());
        let mut intersection: Option<RoaringBitmap> = None;

        for (i, token) in tokens.iter().enumerate() {
            let is_last = i + 1 == tokens.len();
            let mut candidates =
                trie.fuzzy_search(token.as_bytes(), cost, params.prefix && is_last);
            if candidates.is_empty() {
                return None;
            }

            match params.token_order {
                TokenOrder::Frequency => {
                    candidates.sort_by_key(|m| std::cmp::Reverse(m.postings.len()))
                }
                TokenOrder::MaxScore => {
                    candidates.sort_by_key(|m| std::cmp::Reverse(m.max_points))
                }
            }
            candidates.truncate(params.max_candidates);

            let mut union = RoaringBitmap::new();
            for candidate in &candidates {
                for &seq_id in candidate.postings.ids() {
                    union.insert(seq_id);
                }
            }

            let narrowed = match intersection.take() {
                None => union,
                Some(previous) => previous & union,
            };
            if narrowed.is_empty() {
                return None;
            }
            intersection = Some(narrowed);
            per_token.push(candidates);
        }

        intersection.map(|ids| (ids, per_token))
    }

    fn apply_filters(&self, ids: &mut RoaringBitmap, filters: &[FilterClause]) {
        if filters.is_empty() {
            return;
        }
        let mut keep = RoaringBitmap::new();
        'docs: for seq_id in ids.iter() {
            for clause in filters {
                if !self.clause_matches(seq_id, clause) {
                    continue 'docs;
                }
            }
            keep.insert(seq_id);
        }
        *ids = keep;
    }

    fn clause_matches(&self, seq_id: u32, clause: &FilterClause) -> bool {
        let Some(values) = self
            .forward_index
            .get(&clause.field)
            .and_then(|m| m.get(&seq_id))
        else {
            return false;
        };

        match (values, &clause.value) {
            (FieldValues::Strings(values), FilterValue::Str(wanted)) => {
                values.iter().any(|v| v == wanted)
            }
            (FieldValues::Ints(values), FilterValue::Int(wanted)) => {
                values.iter().any(|v| clause.op.matches(v.cmp(wanted)))
            }
            (FieldValues::Floats(values), FilterValue::Float(wanted)) => values.iter().any(|v| {
                v.partial_cmp(wanted)
                    .map(|ordering| clause.op.matches(ordering))
                    .unwrap_or(false)
            }),
            _ => false,
        }
    }

    fn sort_attrs(&self, seq_id: u32, params: &SearchParams<'_>) -> (i64, i64) {
        let attr = |i: usize| -> Option<i64> {
            params.sort_fields.get(i).map(|(name, descending)| {
                let value = self
                    .sort_index
                    .get(name)
                    .and_then(|m| m.get(&seq_id))
                    .copied()
                    .unwrap_or(0);
                if *descending {
                    value
                } else {
                    -value
                }
            })
        };

        let primary = attr(0).unwrap_or_else(|| {
            if params.use_points {
                self.points_index.get(&seq_id).copied().unwrap_or(0)
            } else {
                0
            }
        });
        let secondary = attr(1).unwrap_or(0);
        (primary, secondary)
    }
}

/// Token positions of a string or string-array value
fn string_positions(field_type: FieldType, value: &Value) -> HashMap<String, Vec<u16>> {
    match field_type {
        FieldType::String => tokenizer::token_positions(value.as_str().unwrap_or("")),
        FieldType::StringArray => {
            let mut positions = HashMap::new();
            let mut base = 0u16;
            for element in value.as_array().into_iter().flatten() {
                base = tokenizer::accumulate_positions(
                    element.as_str().unwrap_or(""),
                    base,
                    &mut positions,
                );
            }
            positions
        }
        _ => HashMap::new(),
    }
}

/// Distinct tokens of a string or string-array value
fn string_tokens(field_type: FieldType, value: &Value) -> HashSet<String> {
    let mut tokens = HashSet::new();
    match field_type {
        FieldType::String => {
            tokens.extend(tokenizer::tokenize(value.as_str().unwrap_or("")));
        }
        FieldType::StringArray => {
            for element in value.as_array().into_iter().flatten() {
                tokens.extend(tokenizer::tokenize(element.as_str().unwrap_or("")));
            }
        }
        _ => {}
    }
    tokens
}

fn field_values(field_type: FieldType, value: &Value) -> FieldValues {
    match field_type {
        FieldType::String => FieldValues::Strings(vec![value.as_str().unwrap_or("").to_string()]),
        FieldType::StringArray => FieldValues::Strings(
            value
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        FieldType::Int32 | FieldType::Int64 => {
            FieldValues::Ints(vec![value.as_i64().unwrap_or(0)])
        }
        FieldType::Int32Array | FieldType::Int64Array => FieldValues::Ints(
            value
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_i64)
                .collect(),
        ),
        FieldType::Float => FieldValues::Floats(vec![value.as_f64().unwrap_or(0.0)]),
        FieldType::FloatArray => FieldValues::Floats(
            value
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_f64)
                .collect(),
        ),
    }
}

/// Sort key for a single-valued numeric field; floats use the
/// order-preserving integer encoding
fn sort_key(field_type: FieldType, value: &Value) -> i64 {
    match field_type {
        FieldType::Float => encode_float_order(value.as_f64().unwrap_or(0.0) as f32) as i64,
        _ => value.as_i64().unwrap_or(0),
    }
}
