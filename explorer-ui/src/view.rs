//! The explorer's two views and the data sources behind them
//!
//! | View | Path | Endpoint | First page | Page size |
//! |------|------|----------|------------|-----------|
//! | Checkpoint list | `/` | `api/checkpoints` | 1 | configured |
//! | Checkpoint detail | `/checkpoint` | `api/checkpoint` | 0 | 1 |
//!
//! On the detail view the page number is the checkpoint index.

use explorer_common::config::ExplorerConfig;
use explorer_common::{Checkpoint, Error, Result};
use reqwest::Url;
use std::sync::Arc;

use crate::fetcher::{build_http_client, HttpPageSource, PageSource};
use crate::location::{app_url, with_page_param, PAGE_PARAM};
use crate::search::{HttpSearchSource, SearchSource, SEARCH_API_PATH};

/// Shared handle to a checkpoint page source
pub type CheckpointSource = Arc<dyn PageSource<Item = Checkpoint>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerView {
    Checkpoints,
    CheckpointDetail,
}

impl ExplorerView {
    pub fn path(&self) -> &'static str {
        match self {
            ExplorerView::Checkpoints => "/",
            ExplorerView::CheckpointDetail => "/checkpoint",
        }
    }

    pub fn api_path(&self) -> &'static str {
        match self {
            ExplorerView::Checkpoints => "api/checkpoints",
            ExplorerView::CheckpointDetail => "api/checkpoint",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ExplorerView::Checkpoints => "Checkpoints",
            ExplorerView::CheckpointDetail => "Checkpoint",
        }
    }

    /// Page shown when the URL carries none
    pub fn first_page(&self) -> u64 {
        match self {
            ExplorerView::Checkpoints => 1,
            ExplorerView::CheckpointDetail => 0,
        }
    }

    pub fn page_size(&self, configured: u64) -> u64 {
        match self {
            ExplorerView::Checkpoints => configured,
            ExplorerView::CheckpointDetail => 1,
        }
    }

    /// View mounted for a location; unknown paths have none
    pub fn from_location(url: &Url) -> Option<Self> {
        match url.path().trim_end_matches('/') {
            "" => Some(ExplorerView::Checkpoints),
            "/checkpoint" => Some(ExplorerView::CheckpointDetail),
            _ => None,
        }
    }

    /// Location of `page` in this view
    pub fn location(&self, page: u64) -> Result<Url> {
        Ok(with_page_param(&app_url(self.path())?, PAGE_PARAM, page))
    }
}

/// Data sources for every view
#[derive(Clone)]
pub struct ExplorerSources {
    pub checkpoints: CheckpointSource,
    pub checkpoint_detail: CheckpointSource,
    pub search: Arc<dyn SearchSource>,
}

impl ExplorerSources {
    /// HTTP sources against the configured API
    pub fn http(config: &ExplorerConfig) -> Result<Self> {
        let client = build_http_client(config.request_timeout)
            .map_err(|e| Error::Internal(e.to_string()))?;

        let endpoint = |view: ExplorerView| config.api_url(view.api_path());

        Ok(Self {
            checkpoints: Arc::new(HttpPageSource::<Checkpoint>::new(
                client.clone(),
                endpoint(ExplorerView::Checkpoints)?,
            )),
            checkpoint_detail: Arc::new(HttpPageSource::<Checkpoint>::new(
                client.clone(),
                endpoint(ExplorerView::CheckpointDetail)?,
            )),
            search: Arc::new(HttpSearchSource::new(
                client,
                config.api_url(SEARCH_API_PATH)?,
            )),
        })
    }

    pub fn for_view(&self, view: ExplorerView) -> CheckpointSource {
        match view {
            ExplorerView::Checkpoints => Arc::clone(&self.checkpoints),
            ExplorerView::CheckpointDetail => Arc::clone(&self.checkpoint_detail),
        }
    }
}
