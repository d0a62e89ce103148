use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One facet value and the number of matched documents carrying it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacetValueCount {
    pub value: String,
    pub count: u64,
}

/// Top facet values for one field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacetCounts {
    pub field_name: String,
    pub counts: Vec<FacetValueCount>,
}

/// Search response
///
/// Serializes to exactly `{"hits": [...], "found": n, "facet_counts": [...]}`.
/// Each hit is the stored document, with `_highlight.<field>` injected for
/// the field the query matched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<Value>,
    pub found: u64,
    pub facet_counts: Vec<FacetCounts>,
}

impl SearchResponse {
    pub fn empty(found: u64) -> Self {
        Self {
            hits: Vec::new(),
            found,
            facet_counts: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).expect("search response is always serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_shape() {
        let response = SearchResponse {
            hits: vec![json!({"id": "0", "title": "a"})],
            found: 1,
            facet_counts: vec![FacetCounts {
                field_name: "tags".to_string(),
                counts: vec![FacetValueCount {
                    value: "x".to_string(),
                    count: 2,
                }],
            }],
        };

        let value = response.to_json();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(value["found"], 1);
        assert_eq!(value["facet_counts"][0]["field_name"], "tags");
        assert_eq!(value["facet_counts"][0]["counts"][0]["count"], 2);
    }

    #[test]
    fn test_empty_response() {
        let response = SearchResponse::empty(5);
        assert_eq!(response.found, 5);
        assert!(response.hits.is_empty());
        assert!(response.facet_counts.is_empty());
    }
}
