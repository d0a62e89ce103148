use serde::{Deserialize, Serialize};

use crate::error::{Result, ShoalError};
use crate::schema::Field;
use crate::store::{keys, Store};

/// Persisted description of a collection
///
/// Stored as JSON under the `$CM` key so a process can rebuild the
/// collection (schema plus replayed documents) from the store alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub name: String,
    pub collection_id: u32,
    pub fields: Vec<Field>,
    pub token_ranking_field: Option<String>,
}

impl CollectionMeta {
    pub fn persist(&self, store: &dyn Store) -> Result<()> {
        let payload =
            serde_json::to_vec(self).map_err(|e| ShoalError::Store(e.to_string()))?;
        store.insert(&keys::meta_key(&self.name), &payload)
    }

    pub fn load(store: &dyn Store, name: &str) -> Result<Option<CollectionMeta>> {
        match store.get(&keys::meta_key(name))? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|_| {
                ShoalError::Corruption(format!(
                    "Error while parsing collection meta for `{}`.",
                    name
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use crate::store::MemoryStore;

    #[test]
    fn test_meta_round_trip() {
        let store = MemoryStore::new();
        let meta = CollectionMeta {
            name: "books".to_string(),
            collection_id: 3,
            fields: vec![
                Field::new("title", FieldType::String),
                Field::faceted("tags", FieldType::StringArray),
            ],
            token_ranking_field: Some("points".to_string()),
        };

        meta.persist(&store).unwrap();
        let loaded = CollectionMeta::load(&store, "books").unwrap().unwrap();
        assert_eq!(loaded, meta);
    }

    #[test]
    fn test_meta_absent() {
        let store = MemoryStore::new();
        assert!(CollectionMeta::load(&store, "nope").unwrap().is_none());
    }

    #[test]
    fn test_meta_corruption() {
        let store = MemoryStore::new();
        store.insert(&keys::meta_key("books"), b"{not json").unwrap();
        let err = CollectionMeta::load(&store, "books").unwrap_err();
        assert_eq!(err.code(), 500);
    }
}
