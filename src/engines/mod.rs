//! Search engine adapters with a uniform trait-based interface.
//!
//! Each backend (EBSCOhost EIT, WorldCat SRU, JournalTOCs) gets one adapter
//! implementing [`SearchEngine`]. Engines are constructed once from a
//! validated config struct, registered in an [`EngineRegistry`], and invoked
//! concurrently: they hold only immutable configuration plus a shared HTTP
//! client, so no internal locking is needed.
//!
//! The `search`/`get` contract is deliberately asymmetric:
//!
//! - [`SearchEngine::search`] never fails. Zero hits is a successful empty
//!   set; a backend failure comes back as a [`ResultSet`] with `failed`
//!   set and the backend's own error text attached. This keeps fan-out
//!   callers simple: every engine always produces a set to fan in.
//! - [`SearchEngine::get`] is a precise single-record lookup and raises:
//!   a malformed identifier ([`EngineError::InvalidIdentifier`], before any
//!   network traffic), zero matches ([`EngineError::NotFound`]), or
//!   transport/parse trouble ([`EngineError::Fetch`]).

pub mod ebsco_format;
mod ebsco_host;
mod journal_tocs;
pub mod mock;
mod registry;
mod worldcat_sru_dc;

pub use ebsco_host::{DatabaseInfo, EbscoHostConfig, EbscoHostEngine};
pub use journal_tocs::{JournalTocsConfig, JournalTocsEngine};
pub use mock::MockEngine;
pub use registry::{EngineCapabilities, EngineRegistry};
pub use worldcat_sru_dc::{WorldcatSruDcConfig, WorldcatSruDcEngine};

use crate::models::{ResultItem, ResultSet, SearchQuery};
use async_trait::async_trait;

/// Common interface implemented by every backend adapter.
#[async_trait]
pub trait SearchEngine: Send + Sync + std::fmt::Debug {
    /// Identifier this engine registers under. Defaults to the backend kind
    /// (`"ebsco_host"`, ...) and is overridable through the config struct,
    /// so two differently-configured instances of one backend can coexist.
    fn id(&self) -> &str;

    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// What this engine can do.
    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH
    }

    fn supports_get(&self) -> bool {
        self.capabilities().contains(EngineCapabilities::GET)
    }

    /// Run a search. Never fails: backend errors are encoded in the
    /// returned set.
    async fn search(&self, query: &SearchQuery) -> ResultSet;

    /// Look up a single record by its backend-specific `unique_id`.
    async fn get(&self, _identifier: &str) -> Result<ResultItem, EngineError> {
        Err(EngineError::Unsupported)
    }
}

/// Errors surfaced by engine construction, registry lookup, and `get`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown engine id, or a required configuration field is missing or
    /// invalid at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `get()` was called with an identifier that does not match the
    /// backend's expected shape. Raised before any network call.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// `get()` resolved to zero backend matches: confirmed absent, as
    /// opposed to "could not confirm".
    #[error("no record found for: {0}")]
    NotFound(String),

    /// Transport failure, backend-reported error document, or unparseable
    /// payload.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The engine does not offer this operation.
    #[error("operation not supported by this engine")]
    Unsupported,
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        // without_url: reqwest error displays can embed the request URL,
        // which carries credentials as query parameters.
        EngineError::Fetch(err.without_url().to_string())
    }
}

impl From<quick_xml::DeError> for EngineError {
    fn from(err: quick_xml::DeError) -> Self {
        EngineError::Fetch(format!("XML: {}", err))
    }
}

/// Trimmed, non-empty text or nothing. Backends routinely emit empty
/// elements that must normalize to "absent", never to `""`.
pub(crate) fn presence(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
