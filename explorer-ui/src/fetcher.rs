//! Page fetching over HTTP with last-write-wins ordering
//!
//! One fetch is one GET against a paginated endpoint. Every fetch is issued
//! with a [`RequestTicket`]; only the completion carrying the most recently
//! issued ticket may be applied to the view. Earlier fetches are not
//! cancelled on the wire, their results are just dropped when they arrive.

use async_trait::async_trait;
use explorer_common::api::{decode_page, PageResult, ShapeError};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Query parameter carrying the page number on API requests
pub const API_PAGE_PARAM: &str = "p";

/// Query parameter carrying the page size on API requests
pub const API_PAGE_SIZE_PARAM: &str = "ps";

const USER_AGENT: &str = concat!("checkpoint-explorer/", env!("CARGO_PKG_VERSION"));

/// Fetch failures
///
/// Any of these leaves the previously displayed page untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("API error {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("API reported error: {0}")]
    Api(String),
}

impl From<ShapeError> for FetchError {
    fn from(err: ShapeError) -> Self {
        match err {
            ShapeError::ApiError(message) => FetchError::Api(message),
            other => FetchError::Malformed(other.to_string()),
        }
    }
}

/// Build the shared HTTP client
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| FetchError::Transport(e.to_string()))
}

/// Source of paginated records
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send + 'static;

    /// Fetch one page; a single round trip
    async fn fetch_page(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<PageResult<Self::Item>, FetchError>;
}

/// [`PageSource`] backed by a JSON endpoint
pub struct HttpPageSource<T> {
    client: reqwest::Client,
    endpoint: Url,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpPageSource<T> {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            _item: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Endpoint with page and page size query parameters
    pub fn request_url(&self, page: u64, page_size: u64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(API_PAGE_PARAM, &page.to_string())
            .append_pair(API_PAGE_SIZE_PARAM, &page_size.to_string());
        url
    }
}

#[async_trait]
impl<T> PageSource for HttpPageSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Item = T;

    async fn fetch_page(&self, page: u64, page_size: u64) -> Result<PageResult<T>, FetchError> {
        let url = self.request_url(page, page_size);
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(decode_page(&bytes, page)?)
    }
}

// ========================================
// Last-write-wins bookkeeping
// ========================================

/// Identity of one issued fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub seq: u64,
    pub page: u64,
}

/// A fetch the caller should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: RequestTicket,
    pub page_size: u64,
}

impl FetchRequest {
    pub fn page(&self) -> u64 {
        self.ticket.page
    }
}

/// A finished fetch, tagged with the ticket it was issued under
#[derive(Debug, Clone)]
pub struct FetchCompletion<T> {
    pub ticket: RequestTicket,
    pub result: Result<PageResult<T>, FetchError>,
}

/// Run a fetch request against a source
pub async fn execute<S>(source: &S, request: FetchRequest) -> FetchCompletion<S::Item>
where
    S: PageSource + ?Sized,
{
    let result = source
        .fetch_page(request.ticket.page, request.page_size)
        .await;
    FetchCompletion {
        ticket: request.ticket,
        result,
    }
}

/// Tracks the latest issued ticket
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_seq: u64,
    latest: Option<RequestTicket>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `page`; it supersedes every earlier ticket
    pub fn issue(&mut self, page: u64) -> RequestTicket {
        self.next_seq += 1;
        let ticket = RequestTicket {
            seq: self.next_seq,
            page,
        };
        self.latest = Some(ticket);
        ticket
    }

    /// Whether a completion for `ticket` may be applied
    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.latest == Some(ticket)
    }

    /// Accept the completion of `ticket` if it is the latest
    ///
    /// Returns false for superseded tickets, which must be discarded.
    pub fn settle(&mut self, ticket: RequestTicket) -> bool {
        if self.is_latest(ticket) {
            self.latest = None;
            true
        } else {
            false
        }
    }

    /// Ticket still waiting for its completion, if any
    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.latest
    }
}
