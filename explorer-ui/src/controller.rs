//! Pagination controller
//!
//! Owns the page state of one mounted view and decides what to fetch. It does
//! no I/O: page requests return a [`FetchRequest`] for the caller to run, and
//! the caller feeds the [`FetchCompletion`] back in. This keeps every state
//! change on the caller's single event loop.
//!
//! States:
//! - `Idle`: showing `last_good`, nothing in flight
//! - `Loading { target_page }`: a fetch is in flight, `last_good` still shown
//! - `Error { message }`: the last fetch failed, `last_good` still shown
//!   unless the failed fetch came from the URL (see [`PaginationController::load`])
//!
//! Rejected page requests (out of range, disabled control) change nothing.

use explorer_common::api::{PageResult, PaginationMetadata};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetcher::{FetchCompletion, FetchError, FetchRequest, RequestTracker};
use crate::location::{QueryStateSync, WriteOutcome};
use crate::pagination::{parse_page_input, NavTarget, OutOfRange, PageBounds, PageControls};

/// Controller state, see module docs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Loading { target_page: u64 },
    Error { message: String },
}

/// Why a page request was not issued
///
/// Display text is meant for the transient alert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("{0}")]
    OutOfRange(#[from] OutOfRange),

    #[error("No data found")]
    NoData,

    #[error("Page information is still loading")]
    NotLoaded,

    #[error("{}", disabled_message(.0))]
    ControlDisabled(NavTarget),
}

fn disabled_message(target: &NavTarget) -> &'static str {
    match target {
        NavTarget::First | NavTarget::Previous => "Already on the first page",
        NavTarget::Next | NavTarget::Last => "Already on the last page",
    }
}

/// What happened to a fetch completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// New page adopted and written to the URL
    Applied {
        page: u64,
        previous_page: Option<u64>,
        url: WriteOutcome,
    },
    /// Superseded by a later request and discarded
    Stale,
    /// Latest request failed; previous page still shown
    Failed(FetchError),
}

pub struct PaginationController<T> {
    page_size: u64,
    state: ControllerState,
    last_good: Option<PageResult<T>>,
    last_requested: Option<u64>,
    /// Latest request came from the URL rather than from the controls
    from_location: bool,
    tracker: RequestTracker,
}

impl<T> PaginationController<T> {
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size,
            state: ControllerState::Idle,
            last_good: None,
            last_requested: None,
            from_location: false,
            tracker: RequestTracker::new(),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ControllerState::Loading { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ControllerState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Last successfully fetched page
    pub fn page_result(&self) -> Option<&PageResult<T>> {
        self.last_good.as_ref()
    }

    pub fn metadata(&self) -> Option<PaginationMetadata> {
        self.last_good.as_ref().map(PageResult::metadata)
    }

    pub fn current_page(&self) -> Option<u64> {
        self.metadata().map(|m| m.current_page)
    }

    pub fn bounds(&self) -> Option<PageBounds> {
        self.metadata().as_ref().map(PageBounds::from_metadata)
    }

    /// Enabled state of the pagination controls
    ///
    /// Disabled until the first page has been fetched.
    pub fn controls(&self) -> PageControls {
        self.metadata()
            .as_ref()
            .map(PageControls::for_metadata)
            .unwrap_or_else(PageControls::disabled)
    }

    /// Fetch `page` without a bounds check
    ///
    /// Used when the page comes from the URL (initial load, back/forward):
    /// bounds are not known yet or belong to another history entry. The URL
    /// already names `page`, so if this fetch fails the previously shown page
    /// is dropped rather than left on display under the new URL.
    pub fn load(&mut self, page: u64) -> FetchRequest {
        let request = self.issue(page);
        self.from_location = true;
        request
    }

    /// Validated page change
    pub fn request_page(&mut self, requested: Option<i64>) -> Result<FetchRequest, NavigationError> {
        let bounds = self.bounds().ok_or(NavigationError::NotLoaded)?;
        if bounds.is_empty() {
            return Err(NavigationError::NoData);
        }

        let page = bounds.validate(requested)?;
        Ok(self.issue(page))
    }

    /// Page typed into the page field (blur or Enter)
    pub fn submit_input(&mut self, input: &str) -> Result<FetchRequest, NavigationError> {
        self.request_page(parse_page_input(input))
    }

    /// First / previous / next / last buttons
    pub fn navigate(&mut self, target: NavTarget) -> Result<FetchRequest, NavigationError> {
        let metadata = self.metadata().ok_or(NavigationError::NotLoaded)?;
        let controls = PageControls::for_metadata(&metadata);
        if controls.all_disabled() {
            return Err(NavigationError::NoData);
        }
        if !controls.is_enabled(target) {
            return Err(NavigationError::ControlDisabled(target));
        }

        self.request_page(Some(target.target_page(&metadata)))
    }

    /// Re-fetch the page currently shown
    ///
    /// Returns `None` while another fetch is in flight: that fetch is newer
    /// than anything a refresh would bring.
    pub fn refresh(&mut self) -> Option<FetchRequest> {
        if self.is_loading() {
            debug!("Refresh skipped, fetch already in flight");
            return None;
        }

        let page = self.current_page().or(self.last_requested)?;
        Some(self.issue(page))
    }

    /// Apply a finished fetch
    ///
    /// Only the latest issued request is applied. On success the new page is
    /// written to the URL so that URL and display agree.
    pub fn on_fetch_completed(
        &mut self,
        completion: FetchCompletion<T>,
        location: &mut QueryStateSync,
    ) -> CompletionOutcome {
        if !self.tracker.settle(completion.ticket) {
            debug!(
                page = completion.ticket.page,
                seq = completion.ticket.seq,
                "Discarding stale fetch result"
            );
            return CompletionOutcome::Stale;
        }

        match completion.result {
            Ok(result) => {
                let previous_page = self.current_page();
                let page = result.current_page();
                let url = location.write(page);

                info!(
                    page,
                    total_pages = result.metadata().total_pages,
                    items = result.items().len(),
                    "Page loaded"
                );

                self.last_good = Some(result);
                self.state = ControllerState::Idle;

                CompletionOutcome::Applied {
                    page,
                    previous_page,
                    url,
                }
            }
            Err(err) => {
                let page = completion.ticket.page;
                let url_moved_on = self.from_location && self.current_page() != Some(page);
                if url_moved_on {
                    warn!(page, error = %err, "Fetch for URL page failed, clearing previous page");
                    self.last_good = None;
                } else {
                    warn!(page, error = %err, "Fetch failed, keeping previous page");
                }
                self.state = ControllerState::Error {
                    message: err.to_string(),
                };
                CompletionOutcome::Failed(err)
            }
        }
    }

    fn issue(&mut self, page: u64) -> FetchRequest {
        let ticket = self.tracker.issue(page);
        self.last_requested = Some(page);
        self.from_location = false;
        self.state = ControllerState::Loading { target_page: page };
        debug!(page, seq = ticket.seq, "Fetch issued");

        FetchRequest {
            ticket,
            page_size: self.page_size,
        }
    }
}
