//! Free-text search: block number or block hash to checkpoint index
//!
//! The server resolves the query; the client only trims it, refuses an empty
//! one and turns the envelope into a [`SearchOutcome`].

use async_trait::async_trait;
use explorer_common::api::{decode_search, SearchOutcome};
use reqwest::Url;
use tracing::{debug, info};

use crate::fetcher::FetchError;

/// API path of the search endpoint, relative to the API base URL
pub const SEARCH_API_PATH: &str = "api/search";

/// Query parameter carrying the search text
pub const SEARCH_PARAM: &str = "query";

/// Alert shown for an empty query
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a block number or block hash";

const BLOCK_HASH_HEX_LEN: usize = 64;

/// What a query looks like; only used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    BlockNumber,
    BlockHash,
    Other,
}

/// Classify a trimmed query the way the search endpoint interprets it
pub fn classify_query(query: &str) -> QueryKind {
    if query.parse::<u64>().is_ok() {
        return QueryKind::BlockNumber;
    }

    let hex = query.strip_prefix("0x").unwrap_or(query);
    if hex.len() == BLOCK_HASH_HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        QueryKind::BlockHash
    } else {
        QueryKind::Other
    }
}

/// Trim a query; `None` when nothing is left
pub fn prepare_query(raw: &str) -> Option<&str> {
    let query = raw.trim();
    (!query.is_empty()).then_some(query)
}

#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchOutcome, FetchError>;
}

pub struct HttpSearchSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSearchSource {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(SEARCH_PARAM, query);
        url
    }
}

#[async_trait]
impl SearchSource for HttpSearchSource {
    async fn search(&self, query: &str) -> Result<SearchOutcome, FetchError> {
        info!(query, kind = ?classify_query(query), "Search request");
        let url = self.request_url(query);

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

        let outcome = decode_search(&bytes)?;
        debug!(?outcome, "Search resolved");
        Ok(outcome)
    }
}
