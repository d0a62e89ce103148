//! Collection lifecycle and search orchestration
//!
//! A collection owns its schema, a fixed set of index shards, the sequence
//! counter and a handle to the store. Ingestion routes each document to
//! shard `seq_id % num_shards`; search fans out to every shard and merges
//! the shard topsters into one ranked page.

mod highlight;
mod meta;

pub use meta::CollectionMeta;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::CollectionSettings;
use crate::error::{Result, ShoalError};
use crate::index::{
    encode_float_order, IndexShard, SearchAccumulators, SearchParams, SearchedQuery,
};
use crate::models::{
    parse_filter_query, FacetCounts, FacetValueCount, SearchRequest, SearchResponse,
};
use crate::schema::{Field, FieldType, Schema};
use crate::store::{keys, SequenceCounter, Store};
use crate::tokenizer;

const STORED_DOC_PARSE_ERROR: &str = "Error while parsing stored document.";

/// A typed document store with typo-tolerant search
pub struct Collection {
    name: String,
    collection_id: u32,
    schema: Arc<Schema>,
    settings: CollectionSettings,
    store: Arc<dyn Store>,
    shards: Vec<RwLock<IndexShard>>,
    seq_counter: Mutex<SequenceCounter>,
    num_documents: AtomicU64,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        collection_id: u32,
        initial_next_seq_id: u32,
        store: Arc<dyn Store>,
        fields: Vec<Field>,
        token_ranking_field: Option<String>,
    ) -> Result<Self> {
        Self::with_settings(
            name,
            collection_id,
            initial_next_seq_id,
            store,
            fields,
            token_ranking_field,
            CollectionSettings::default(),
        )
    }

    pub fn with_settings(
        name: impl Into<String>,
        collection_id: u32,
        initial_next_seq_id: u32,
        store: Arc<dyn Store>,
        fields: Vec<Field>,
        token_ranking_field: Option<String>,
        settings: CollectionSettings,
    ) -> Result<Self> {
        let name = name.into();
        let schema = Arc::new(Schema::new(fields, token_ranking_field)?);
        let shards = (0..settings.num_shards)
            .map(|_| RwLock::new(IndexShard::new(Arc::clone(&schema))))
            .collect();
        let seq_counter = Mutex::new(SequenceCounter::new(&name, initial_next_seq_id));

        Ok(Self {
            name,
            collection_id,
            schema,
            settings,
            store,
            shards,
            seq_counter,
            num_documents: AtomicU64::new(0),
        })
    }

    /// Rebuild a collection from its persisted meta and stored documents
    ///
    /// Documents replay in insertion order thanks to the big-endian seq id
    /// key tail.
    pub fn load(store: Arc<dyn Store>, name: &str) -> Result<Self> {
        let meta = CollectionMeta::load(store.as_ref(), name)?.ok_or_else(|| {
            ShoalError::NotFound(format!("Could not find a collection named `{}`.", name))
        })?;
        let counter = SequenceCounter::load(store.as_ref(), name)?;

        let collection = Self::new(
            meta.name,
            meta.collection_id,
            counter.peek(),
            Arc::clone(&store),
            meta.fields,
            meta.token_ranking_field,
        )?;

        for (key, raw) in store.scan_prefix(&keys::seq_id_prefix(collection.collection_id))? {
            let Some(seq_id) = keys::decode_seq_id_key(&key) else {
                continue;
            };
            let document: Value = serde_json::from_slice(&raw)
                .map_err(|_| ShoalError::Corruption(STORED_DOC_PARSE_ERROR.to_string()))?;
            let Value::Object(document) = document else {
                return Err(ShoalError::Corruption(STORED_DOC_PARSE_ERROR.to_string()));
            };
            collection.index_in_memory(&document, seq_id)?;
        }

        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_id(&self) -> u32 {
        self.collection_id
    }

    pub fn num_documents(&self) -> u64 {
        self.num_documents.load(Ordering::SeqCst)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn token_ranking_field(&self) -> Option<&str> {
        self.schema.token_ranking_field()
    }

    /// The seq id the next `add` will be assigned
    pub fn next_seq_id(&self) -> u32 {
        self.seq_counter.lock().peek()
    }

    pub fn facet_fields(&self) -> Vec<String> {
        self.schema.facet_schema().keys().cloned().collect()
    }

    pub fn sort_fields(&self) -> Vec<Field> {
        self.schema.sort_schema().values().cloned().collect()
    }

    pub fn meta(&self) -> CollectionMeta {
        CollectionMeta {
            name: self.name.clone(),
            collection_id: self.collection_id,
            fields: self.schema.fields().to_vec(),
            token_ranking_field: self.schema.token_ranking_field().map(str::to_string),
        }
    }

    /// Write the collection meta under its `$CM` key
    pub fn persist_meta(&self) -> Result<()> {
        self.meta().persist(self.store.as_ref())
    }

    /// Ingest one raw JSON document, returning its id
    ///
    /// The seq id is allocated before validation and never reused, so a
    /// rejected document burns its id. If the store writes fail after the
    /// in-memory insert, the insert is rolled back and the error surfaced.
    pub fn add(&self, json_str: &str) -> Result<String> {
        let parsed: Value = serde_json::from_str(json_str)
            .map_err(|_| ShoalError::BadRequest("Bad JSON.".to_string()))?;
        let Value::Object(mut document) = parsed else {
            return Err(ShoalError::BadRequest("Bad JSON.".to_string()));
        };

        let seq_id = self.seq_counter.lock().next(self.store.as_ref())?;

        let doc_id = match document.get("id") {
            None => {
                let id = seq_id.to_string();
                document.insert("id".to_string(), Value::String(id.clone()));
                id
            }
            Some(Value::String(id)) => id.clone(),
            Some(_) => {
                return Err(ShoalError::BadRequest(
                    "Document's `id` field should be a string.".to_string(),
                ));
            }
        };

        self.index_in_memory(&document, seq_id)?;

        let raw = Value::Object(document.clone()).to_string();
        let write = self
            .store
            .insert(
                &keys::doc_id_key(self.collection_id, &doc_id),
                seq_id.to_string().as_bytes(),
            )
            .and_then(|_| {
                self.store
                    .insert(&keys::seq_id_key(self.collection_id, seq_id), raw.as_bytes())
            });

        if let Err(error) = write {
            // no partial state may remain after a failed ingest
            self.shard_for(seq_id).write().remove(seq_id, &document);
            self.num_documents.fetch_sub(1, Ordering::SeqCst);
            let _ = self
                .store
                .remove(&keys::doc_id_key(self.collection_id, &doc_id));
            let _ = self
                .store
                .remove(&keys::seq_id_key(self.collection_id, seq_id));
            return Err(error);
        }

        debug!(collection = %self.name, seq_id, "document indexed");
        Ok(doc_id)
    }

    /// Fetch the stored document for a caller-visible id
    pub fn get(&self, id: &str) -> Result<Value> {
        let seq_id = self.doc_id_to_seq_id(id)?;
        self.fetch_document(seq_id)
    }

    /// Remove a document from every shard, optionally evicting it from the
    /// store; returns the removed id
    pub fn remove(&self, id: &str, remove_from_store: bool) -> Result<String> {
        let seq_id = self.doc_id_to_seq_id(id)?;
        let document = self.fetch_document(seq_id)?;
        let Value::Object(document) = document else {
            return Err(ShoalError::Corruption(STORED_DOC_PARSE_ERROR.to_string()));
        };

        for shard in &self.shards {
            shard.write().remove(seq_id, &document);
        }

        if remove_from_store {
            self.store
                .remove(&keys::doc_id_key(self.collection_id, id))?;
            self.store
                .remove(&keys::seq_id_key(self.collection_id, seq_id))?;
        }

        self.num_documents.fetch_sub(1, Ordering::SeqCst);
        Ok(id.to_string())
    }

    /// Resolve a caller-visible id to its internal seq id
    pub fn doc_id_to_seq_id(&self, id: &str) -> Result<u32> {
        let bytes = self
            .store
            .get(&keys::doc_id_key(self.collection_id, id))?
            .ok_or_else(|| {
                ShoalError::NotFound(format!("Could not find a document with id: {}", id))
            })?;
        std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(|| {
                ShoalError::Corruption("Error while parsing stored sequence id.".to_string())
            })
    }

    /// Execute a search request
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        if request.search_fields.is_empty() {
            return Err(ShoalError::BadRequest(
                "At least one field must be specified to search.".to_string(),
            ));
        }

        for field_name in &request.search_fields {
            let field = self
                .schema
                .search_schema()
                .get(field_name)
                .ok_or_else(|| {
                    ShoalError::BadRequest(format!(
                        "Could not find a field named `{}` in the schema.",
                        field_name
                    ))
                })?;
            if !field.field_type.is_string_like() {
                return Err(ShoalError::BadRequest(format!(
                    "Field `{}` should be a string or a string array.",
                    field_name
                )));
            }
            if field.facet {
                return Err(ShoalError::BadRequest(format!(
                    "Field `{}` is a faceted field - it cannot be used as a query field.",
                    field_name
                )));
            }
        }

        for field_name in &request.facet_fields {
            if !self.schema.facet_schema().contains_key(field_name) {
                return Err(ShoalError::BadRequest(format!(
                    "Could not find a facet field named `{}` in the schema.",
                    field_name
                )));
            }
        }

        let mut sort_fields: Vec<(String, bool)> = Vec::with_capacity(request.sort_fields.len());
        for sort_by in &request.sort_fields {
            if !self.schema.sort_schema().contains_key(&sort_by.name) {
                return Err(ShoalError::BadRequest(format!(
                    "Could not find a field named `{}` in the schema for sorting.",
                    sort_by.name
                )));
            }
            let descending = match sort_by.order.to_uppercase().as_str() {
                "DESC" => true,
                "ASC" => false,
                _ => {
                    return Err(ShoalError::BadRequest(format!(
                        "Order for field `{}` should be either ASC or DESC.",
                        sort_by.name
                    )));
                }
            };
            sort_fields.push((sort_by.name.clone(), descending));
        }

        if request.page < 1 {
            return Err(ShoalError::Unprocessable(
                "Page must be an integer of value greater than 0.".to_string(),
            ));
        }
        if request.page * request.per_page > self.settings.max_results {
            return Err(ShoalError::Unprocessable(format!(
                "Only the first {} results are available.",
                self.settings.max_results
            )));
        }

        let filters = parse_filter_query(&request.filter_query, &self.schema)?;

        let started = Instant::now();
        let tokens = if request.is_match_all() {
            Vec::new()
        } else {
            tokenizer::tokenize(&request.query)
        };
        let use_points = self.schema.token_ranking_field().is_some() && sort_fields.is_empty();

        let mut acc = SearchAccumulators::default();
        if tokens.is_empty() {
            // the shared match-all plan every shard's entries point at
            acc.searched_queries.push(SearchedQuery {
                field: String::new(),
                tokens: Vec::new(),
            });
        }

        let params = SearchParams {
            tokens: &tokens,
            search_fields: &request.search_fields,
            filters: &filters,
            facet_fields: &request.facet_fields,
            sort_fields: &sort_fields,
            num_typos: request.num_typos,
            token_order: request.token_order,
            prefix: request.prefix,
            use_points,
            max_candidates: self.settings.max_candidates,
            topster_capacity: self.settings.topster_capacity,
        };

        for shard in &self.shards {
            shard.read().search(&params, &mut acc);
        }

        // every ranking attribute sorts descending
        acc.field_order_entries.sort_by(|a, b| {
            let lhs = (
                a.1.match_score,
                a.1.primary_attr,
                a.1.secondary_attr,
                a.0,
                a.1.key,
            );
            let rhs = (
                b.1.match_score,
                b.1.primary_attr,
                b.1.secondary_attr,
                b.0,
                b.1.key,
            );
            rhs.cmp(&lhs)
        });

        let found = acc.total_matched;
        let start = (request.page - 1) * request.per_page;
        if start >= acc.field_order_entries.len() {
            return Ok(SearchResponse::empty(found));
        }
        let end = (request.page * request.per_page).min(acc.field_order_entries.len());

        let mut hits = Vec::with_capacity(end - start);
        for (field_order_index, entry) in &acc.field_order_entries[start..end] {
            let seq_id = entry.key;
            let mut document = self.fetch_document(seq_id)?;

            let matched_field = request
                .search_fields
                .len()
                .checked_sub(*field_order_index)
                .and_then(|i| request.search_fields.get(i));

            if let Some(field_name) = matched_field {
                let is_plain_string = self
                    .schema
                    .search_schema()
                    .get(field_name)
                    .map(|f| f.field_type == FieldType::String)
                    .unwrap_or(false);
                let text = document
                    .get(field_name.as_str())
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let searched = acc.searched_queries.get(entry.query_index as usize);

                if let (true, Some(text), Some(searched)) = (is_plain_string, text, searched) {
                    let shard = self.shard_for(seq_id).read();
                    if let Some(snippet) = highlight::highlight_field(
                        &text,
                        seq_id,
                        searched,
                        &shard,
                        self.settings.snippet_threshold,
                    ) {
                        if let Value::Object(hit) = &mut document {
                            let mut highlights = Map::new();
                            highlights.insert(field_name.clone(), Value::String(snippet));
                            hit.insert("_highlight".to_string(), Value::Object(highlights));
                        }
                    }
                }
            }

            hits.push(document);
        }

        let mut facet_counts = Vec::with_capacity(request.facet_fields.len());
        for facet_field in &request.facet_fields {
            let mut counts: Vec<FacetValueCount> = acc
                .facet_counts
                .get(facet_field)
                .map(|values| {
                    values
                        .iter()
                        .map(|(value, count)| FacetValueCount {
                            value: value.clone(),
                            count: *count,
                        })
                        .collect()
                })
                .unwrap_or_default();
            counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            counts.truncate(10);
            facet_counts.push(FacetCounts {
                field_name: facet_field.clone(),
                counts,
            });
        }

        debug!(
            collection = %self.name,
            found,
            took_us = started.elapsed().as_micros() as u64,
            "search completed"
        );

        Ok(SearchResponse {
            hits,
            found,
            facet_counts,
        })
    }

    /// Validate and insert a document into its shard
    fn index_in_memory(&self, document: &Map<String, Value>, seq_id: u32) -> Result<()> {
        self.schema.validate_document(document)?;
        let points = self.compute_points(document);
        self.shard_for(seq_id).write().index(document, seq_id, points);
        self.num_documents.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// The ranking signal from the token ranking field, 0 when unset
    ///
    /// Floats go through the order-preserving integer encoding so that
    /// comparing points compares the original values.
    fn compute_points(&self, document: &Map<String, Value>) -> i64 {
        let Some(trf) = self.schema.token_ranking_field() else {
            return 0;
        };
        match document.get(trf) {
            Some(value) => {
                if let Some(n) = value.as_i64() {
                    n.clamp(i32::MIN as i64, i32::MAX as i64)
                } else if let Some(f) = value.as_f64() {
                    encode_float_order(f as f32) as i64
                } else {
                    0
                }
            }
            None => 0,
        }
    }

    fn fetch_document(&self, seq_id: u32) -> Result<Value> {
        let raw = self
            .store
            .get(&keys::seq_id_key(self.collection_id, seq_id))?
            .ok_or_else(|| ShoalError::Corruption(STORED_DOC_PARSE_ERROR.to_string()))?;
        serde_json::from_slice(&raw)
            .map_err(|_| ShoalError::Corruption(STORED_DOC_PARSE_ERROR.to_string()))
    }

    fn shard_for(&self, seq_id: u32) -> &RwLock<IndexShard> {
        &self.shards[seq_id as usize % self.shards.len()]
    }
}
