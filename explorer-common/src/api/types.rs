//! Explorer API wire types
//!
//! Every endpoint answers with the same envelope: either `{"result": ...}` or
//! `{"error": "<message>"}`. Paginated endpoints put a [`PaginatedData`] in
//! `result`:
//!
//! ```json
//! {
//!   "result": {
//!     "current_page": 1,
//!     "total_pages": 5,
//!     "absolute_first_page": 1,
//!     "items": [ ... ]
//!   }
//! }
//! ```
//!
//! Bodies are checked once, here, and turned into a typed [`PageResult`] or a
//! [`ShapeError`]. Nothing downstream probes JSON fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ========================================
// Envelope
// ========================================

/// `{"result": T}` or `{"error": "..."}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiEnvelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }

    /// Unwrap the envelope; an `error` member wins over a `result` member
    pub fn into_result(self) -> Result<T, ShapeError> {
        match (self.error, self.result) {
            (Some(message), _) => Err(ShapeError::ApiError(message)),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(ShapeError::MissingResult),
        }
    }
}

/// Body did not match the expected shape
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Malformed response body: {0}")]
    Json(String),

    #[error("Response has neither result nor error")]
    MissingResult,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

// ========================================
// Pagination
// ========================================

/// Paginated result as sent by the server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginatedData<T> {
    /// Page the server actually served; older servers omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    /// Highest valid page number for this endpoint; authoritative until the next fetch
    pub total_pages: u64,
    /// Lowest valid page number, 0 or 1 depending on the endpoint
    pub absolute_first_page: u64,
    /// The items for the current page
    pub items: Vec<T>,
}

/// Pagination bounds attached to every page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationMetadata {
    pub current_page: u64,
    pub total_pages: u64,
    pub first_page: u64,
}

impl PaginationMetadata {
    /// True when the collection has no pages at all
    pub fn has_no_pages(&self) -> bool {
        self.total_pages == 0
    }
}

/// One page of records plus its pagination metadata
///
/// Created fresh for every successful fetch and replaced wholesale by the
/// next one. There are no mutating accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    items: Vec<T>,
    metadata: PaginationMetadata,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, metadata: PaginationMetadata) -> Self {
        Self { items, metadata }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn metadata(&self) -> PaginationMetadata {
        self.metadata
    }

    pub fn current_page(&self) -> u64 {
        self.metadata.current_page
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> PaginatedData<T> {
    /// Validate server data and turn it into a [`PageResult`]
    ///
    /// `requested_page` fills in `current_page` when the server omitted it.
    pub fn into_page_result(self, requested_page: u64) -> Result<PageResult<T>, ShapeError> {
        if self.absolute_first_page > 1 {
            return Err(ShapeError::InvalidField {
                field: "absolute_first_page",
                reason: format!("expected 0 or 1, got {}", self.absolute_first_page),
            });
        }

        let metadata = PaginationMetadata {
            current_page: self.current_page.unwrap_or(requested_page),
            total_pages: self.total_pages,
            first_page: self.absolute_first_page,
        };

        Ok(PageResult::new(self.items, metadata))
    }
}

/// Decode a paginated endpoint body into a typed page
pub fn decode_page<T: DeserializeOwned>(
    body: &[u8],
    requested_page: u64,
) -> Result<PageResult<T>, ShapeError> {
    let envelope: ApiEnvelope<PaginatedData<T>> =
        serde_json::from_slice(body).map_err(|e| ShapeError::Json(e.to_string()))?;
    envelope.into_result()?.into_page_result(requested_page)
}

// ========================================
// Search
// ========================================

/// Outcome of a free-text search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Index of the checkpoint to show
    Found(u64),
    /// Server rejected the query; message is meant for the user
    NotFound(String),
}

/// Decode a search endpoint body
///
/// An `error` envelope is a normal outcome here, not a failure.
pub fn decode_search(body: &[u8]) -> Result<SearchOutcome, ShapeError> {
    let envelope: ApiEnvelope<u64> =
        serde_json::from_slice(body).map_err(|e| ShapeError::Json(e.to_string()))?;

    match envelope.into_result() {
        Ok(idx) => Ok(SearchOutcome::Found(idx)),
        Err(ShapeError::ApiError(message)) => Ok(SearchOutcome::NotFound(message)),
        Err(other) => Err(other),
    }
}

// ========================================
// Tests
// ========================================
