//! Core data models shared by all search engines.

mod item;
mod query;
mod results;

pub use item::{Author, ItemFormat, Link, ResultItem};
pub use query::{SearchQuery, SearchTerms, SemanticField, Sort};
pub use results::{FailureInfo, Pagination, ResultSet};
