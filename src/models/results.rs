//! Search outcome model: result sets, pagination, and embedded failure.

use serde::{Deserialize, Serialize};

use super::ResultItem;

/// Where a page of results sits in the backend's record space.
///
/// `start_record` is the backend-facing 1-based offset; `current_page` is
/// derived from it and always satisfies
/// `current_page == (start_record - 1) / per_page + 1`. When a backend
/// clamps the requested offset (WorldCat caps `startRecord` at 9999), the
/// returned `Pagination` reflects the clamped values, not the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub start_record: u64,
    pub current_page: u64,
    pub per_page: u64,
}

impl Pagination {
    /// Build from a 0-based record offset.
    pub fn from_start(start: usize, per_page: usize) -> Self {
        Self::from_start_record(start as u64 + 1, per_page as u64)
    }

    /// Build from a backend-facing 1-based start record.
    pub fn from_start_record(start_record: u64, per_page: u64) -> Self {
        let start_record = start_record.max(1);
        let per_page = per_page.max(1);
        Pagination {
            start_record,
            current_page: (start_record - 1) / per_page + 1,
            per_page,
        }
    }
}

/// Details of a failed search, embedded in the [`ResultSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Human-readable description, taken from the backend's own error body
    /// when one was derivable. Credentials are redacted.
    pub error_info: String,
    /// HTTP status, when the failure had one.
    pub status: Option<u16>,
}

impl FailureInfo {
    pub fn new(error_info: impl Into<String>) -> Self {
        FailureInfo {
            error_info: error_info.into(),
            status: None,
        }
    }

    pub fn with_status(error_info: impl Into<String>, status: u16) -> Self {
        FailureInfo {
            error_info: error_info.into(),
            status: Some(status),
        }
    }
}

/// The outcome of one `search` call.
///
/// A backend failure is data, not an error: `failed` is set and `error`
/// describes it. A failed set never carries items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub items: Vec<ResultItem>,
    /// Backend-reported total matches, when the backend reports one.
    pub total_items: Option<u64>,
    pub pagination: Pagination,
    pub failed: bool,
    pub error: Option<FailureInfo>,
    /// Id of the engine that produced this set.
    pub engine_id: String,
}

impl ResultSet {
    /// A successful (possibly empty) result set.
    pub fn success(engine_id: impl Into<String>, items: Vec<ResultItem>, pagination: Pagination) -> Self {
        ResultSet {
            items,
            total_items: None,
            pagination,
            failed: false,
            error: None,
            engine_id: engine_id.into(),
        }
    }

    /// A failed result set; items are always empty.
    pub fn failure(engine_id: impl Into<String>, pagination: Pagination, error: FailureInfo) -> Self {
        ResultSet {
            items: Vec::new(),
            total_items: None,
            pagination,
            failed: true,
            error: Some(error),
            engine_id: engine_id.into(),
        }
    }

    pub fn with_total(mut self, total: Option<u64>) -> Self {
        self.total_items = total;
        self
    }

    pub fn first(&self) -> Option<&ResultItem> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
