//! Normalized search request model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Backend-independent field names for fielded searches.
///
/// Each engine translates these into its own field codes (`TI` / `srw.ti` /
/// ...); fields a backend cannot express are searched as plain keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    Title,
    Author,
    Subject,
    Issn,
    Isbn,
    Volume,
    Issue,
    StartPage,
    AccessionNumber,
    AuthorAffiliation,
    OclcNumber,
}

/// Sort order for search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    #[default]
    Relevance,
    DateDesc,
}

/// What to search for: a flat keyword string, or one value per semantic
/// field. The two forms are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTerms {
    Keywords(String),
    Fields(HashMap<SemanticField, String>),
}

impl Default for SearchTerms {
    fn default() -> Self {
        SearchTerms::Keywords(String::new())
    }
}

/// A normalized search request.
///
/// `start` is a 0-based record offset; engines convert to their own
/// (usually 1-based) pagination scheme and clamp where the backend imposes
/// a window limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub terms: SearchTerms,

    /// Raw backend field code (e.g. `"SU"`, `"srw.ti"`), passed through
    /// verbatim. Takes precedence over `semantic_field`.
    pub search_field: Option<String>,

    /// Backend-independent field, translated per engine.
    pub semantic_field: Option<SemanticField>,

    /// 0-based offset of the first record to return.
    pub start: usize,

    /// Records per page; must be positive.
    pub per_page: usize,

    pub sort: Sort,

    /// Restrict to peer-reviewed material (engines that support it).
    pub peer_reviewed_only: bool,

    /// Publication-year window, either end optional.
    pub pubyear_start: Option<String>,
    pub pubyear_end: Option<String>,

    /// Per-call override of an engine's authenticated service level.
    pub auth: Option<bool>,

    /// Per-call override of the configured database set (EBSCO).
    pub databases: Option<Vec<String>>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            terms: SearchTerms::default(),
            search_field: None,
            semantic_field: None,
            start: 0,
            per_page: 10,
            sort: Sort::default(),
            peer_reviewed_only: false,
            pubyear_start: None,
            pubyear_end: None,
            auth: None,
            databases: None,
        }
    }
}

impl SearchQuery {
    /// Free-text keyword query.
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            terms: SearchTerms::Keywords(keywords.into()),
            ..Default::default()
        }
    }

    /// Multi-field query, one value per semantic field.
    pub fn fields(fields: HashMap<SemanticField, String>) -> Self {
        Self {
            terms: SearchTerms::Fields(fields),
            ..Default::default()
        }
    }

    pub fn search_field(mut self, code: impl Into<String>) -> Self {
        self.search_field = Some(code.into());
        self
    }

    pub fn semantic_field(mut self, field: SemanticField) -> Self {
        self.semantic_field = Some(field);
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn peer_reviewed_only(mut self, limit: bool) -> Self {
        self.peer_reviewed_only = limit;
        self
    }

    pub fn pubyear_start(mut self, year: impl Into<String>) -> Self {
        self.pubyear_start = Some(year.into());
        self
    }

    pub fn pubyear_end(mut self, year: impl Into<String>) -> Self {
        self.pubyear_end = Some(year.into());
        self
    }

    pub fn auth(mut self, auth: bool) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn databases(mut self, databases: Vec<String>) -> Self {
        self.databases = Some(databases);
        self
    }

    /// The flat keyword string, if this is a keyword query.
    pub fn keywords(&self) -> Option<&str> {
        match &self.terms {
            SearchTerms::Keywords(kw) => Some(kw.as_str()),
            SearchTerms::Fields(_) => None,
        }
    }
}
