//! Mock engine for testing registries and fan-out consumers.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::engines::{EngineCapabilities, SearchEngine};
use crate::models::{Pagination, ResultSet, SearchQuery};

/// An engine that returns a canned response instead of talking to a
/// backend.
#[derive(Debug)]
pub struct MockEngine {
    id: String,
    search_response: Mutex<Option<ResultSet>>,
}

impl MockEngine {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            search_response: Mutex::new(None),
        }
    }

    /// Set the result set the next searches will return.
    pub fn set_search_response(&self, response: ResultSet) {
        *self.search_response.lock().unwrap() = Some(response);
    }

    pub fn clear_response(&self) {
        *self.search_response.lock().unwrap() = None;
    }
}

#[async_trait]
impl SearchEngine for MockEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Engine"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH
    }

    async fn search(&self, query: &SearchQuery) -> ResultSet {
        match &*self.search_response.lock().unwrap() {
            Some(response) => response.clone(),
            None => ResultSet::success(
                self.id(),
                Vec::new(),
                Pagination::from_start(query.start, query.per_page),
            ),
        }
    }
}
