pub mod collection;
pub mod config;
pub mod error;
pub mod index;
pub mod models;
pub mod schema;
pub mod store;
pub mod tokenizer;

pub use collection::Collection;
pub use config::CollectionSettings;
pub use error::{Result, ShoalError};
pub use models::{SearchRequest, SearchResponse, SortBy, TokenOrder};
pub use schema::{Field, FieldType, Schema};
pub use store::{FjallStore, MemoryStore, Store};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
