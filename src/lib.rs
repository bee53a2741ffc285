//! # bibsearch
//!
//! A unified search client for heterogeneous bibliographic APIs. One
//! normalized [`SearchQuery`] is translated into each backend's own query
//! grammar, executed over HTTPS, and the response (EBSCO's EIT XML,
//! WorldCat's SRU Dublin-Core XML, or JournalTOCs' RSS) is parsed back
//! into one normalized [`ResultSet`].
//!
//! ## Architecture
//!
//! - [`models`]: the normalized data model (queries, items, result sets)
//! - [`engines`]: backend adapters behind the [`SearchEngine`] trait, plus
//!   the [`EngineRegistry`] and the error taxonomy
//! - [`utils`]: the shared HTTP transport wrapper and credential redaction
//!
//! Engines hold only immutable configuration after construction, so one
//! instance can serve concurrent searches; the typical consumer registers
//! several engines and fans the same query out across all of them.
//!
//! ```rust,no_run
//! use bibsearch::engines::{EbscoHostConfig, EbscoHostEngine, EngineRegistry};
//! use bibsearch::models::SearchQuery;
//! use bibsearch::SearchEngine;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), bibsearch::EngineError> {
//! let mut registry = EngineRegistry::new();
//! registry.register(Arc::new(EbscoHostEngine::new(EbscoHostConfig::new(
//!     "my_profile",
//!     "my_password",
//!     vec!["a9h".to_string()],
//! ))?));
//!
//! let engine = registry.get_required("ebsco_host")?;
//! let results = engine.search(&SearchQuery::new("cancer")).await;
//! if results.failed {
//!     eprintln!("backend failed: {:?}", results.error);
//! }
//! # Ok(())
//! # }
//! ```

pub mod engines;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use engines::{EngineError, EngineRegistry, SearchEngine};
pub use models::{ResultItem, ResultSet, SearchQuery};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
