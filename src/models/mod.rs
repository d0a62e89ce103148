//! Request, response and filter models

mod filter;
mod request;
mod response;

pub use filter::{parse_filter_query, FilterClause, FilterOp, FilterValue};
pub use request::{SearchRequest, SortBy, TokenOrder};
pub use response::{FacetCounts, FacetValueCount, SearchResponse};
