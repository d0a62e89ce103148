use serde::{Deserialize, Serialize};

/// Sort directive: field name plus `ASC`/`DESC` (case-insensitive)
///
/// The order is kept as the caller's raw string; it is validated and
/// case-folded when the search request is executed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SortBy {
    pub name: String,
    pub order: String,
}

impl SortBy {
    pub fn new(name: impl Into<String>, order: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: order.into(),
        }
    }

    pub fn asc(name: impl Into<String>) -> Self {
        Self::new(name, "ASC")
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self::new(name, "DESC")
    }
}

/// Tiebreak used when ordering fuzzy variants of a query token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenOrder {
    /// Prefer variants that occur in more documents
    #[default]
    Frequency,
    /// Prefer variants whose best document carries the highest ranking points
    MaxScore,
}

/// Search request
///
/// `search_fields` order matters: the earlier a matched field appears in the
/// list, the higher it ranks on the field-order tiebreak.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Raw query string; empty or `"*"` matches every document
    pub query: String,
    pub search_fields: Vec<String>,
    /// `field: value && field: value` conjunction, empty for none
    #[serde(default)]
    pub filter_query: String,
    #[serde(default)]
    pub facet_fields: Vec<String>,
    #[serde(default)]
    pub sort_fields: Vec<SortBy>,
    /// Per-token edit distance bound
    pub num_typos: usize,
    pub per_page: usize,
    pub page: usize,
    #[serde(default)]
    pub token_order: TokenOrder,
    /// Match the last query token by prefix
    #[serde(default)]
    pub prefix: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            search_fields: Vec::new(),
            filter_query: String::new(),
            facet_fields: Vec::new(),
            sort_fields: Vec::new(),
            num_typos: 2,
            per_page: 10,
            page: 1,
            token_order: TokenOrder::Frequency,
            prefix: false,
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, search_fields: Vec<String>) -> Self {
        Self {
            query: query.into(),
            search_fields,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter_query: impl Into<String>) -> Self {
        self.filter_query = filter_query.into();
        self
    }

    pub fn with_facets(mut self, facet_fields: Vec<String>) -> Self {
        self.facet_fields = facet_fields;
        self
    }

    pub fn with_sort(mut self, sort_fields: Vec<SortBy>) -> Self {
        self.sort_fields = sort_fields;
        self
    }

    pub fn with_num_typos(mut self, num_typos: usize) -> Self {
        self.num_typos = num_typos;
        self
    }

    pub fn with_pagination(mut self, per_page: usize, page: usize) -> Self {
        self.per_page = per_page;
        self.page = page;
        self
    }

    pub fn with_token_order(mut self, token_order: TokenOrder) -> Self {
        self.token_order = token_order;
        self
    }

    pub fn with_prefix(mut self, prefix: bool) -> Self {
        self.prefix = prefix;
        self
    }

    /// Whether this request matches every document
    pub fn is_match_all(&self) -> bool {
        let query = self.query.trim();
        query.is_empty() || query == "*"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = SearchRequest::new("hunger", vec!["title".to_string()]);
        assert_eq!(request.num_typos, 2);
        assert_eq!(request.per_page, 10);
        assert_eq!(request.page, 1);
        assert_eq!(request.token_order, TokenOrder::Frequency);
        assert!(!request.prefix);
    }

    #[test]
    fn test_match_all() {
        assert!(SearchRequest::new("*", vec![]).is_match_all());
        assert!(SearchRequest::new("  ", vec![]).is_match_all());
        assert!(!SearchRequest::new("hunger", vec![]).is_match_all());
    }

    #[test]
    fn test_builder() {
        let request = SearchRequest::new("q", vec!["title".to_string()])
            .with_sort(vec![SortBy::desc("points")])
            .with_num_typos(0)
            .with_pagination(25, 2)
            .with_prefix(true);
        assert_eq!(request.sort_fields[0].order, "DESC");
        assert_eq!(request.num_typos, 0);
        assert_eq!(request.per_page, 25);
        assert_eq!(request.page, 2);
        assert!(request.prefix);
    }

    #[test]
    fn test_token_order_serialization() {
        assert_eq!(
            serde_json::to_string(&TokenOrder::MaxScore).unwrap(),
            "\"MAX_SCORE\""
        );
        assert_eq!(
            serde_json::from_str::<TokenOrder>("\"FREQUENCY\"").unwrap(),
            TokenOrder::Frequency
        );
    }
}
