//! Explorer session: one event loop owning all view state
//!
//! Every mutation happens on the session's task. User input arrives as text
//! lines; fetch completions, search results and refresh ticks arrive on an
//! internal channel; alert expiry is a timer the loop sleeps on. Fetches and
//! searches run on spawned tasks and only post their results back.
//!
//! A mounted view has an epoch. Remounting (link navigation, back/forward to
//! another path, teardown) bumps it, so completions for a view that is gone
//! are dropped on arrival.

use chrono::{DateTime, Local};
use explorer_common::api::SearchOutcome;
use explorer_common::checkpoint::ExplorerLinks;
use explorer_common::config::ExplorerConfig;
use explorer_common::Checkpoint;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::{AlertSlot, ALERT_DURATION};
use crate::controller::{CompletionOutcome, NavigationError, PaginationController};
use crate::fetcher::{execute, FetchCompletion, FetchError, FetchRequest};
use crate::location::{display_location, QueryStateSync, Traversal};
use crate::pagination::{parse_page_input, NavTarget};
use crate::refresher::PeriodicRefresher;
use crate::render::{Frame, Surface};
use crate::search::{prepare_query, EMPTY_QUERY_MESSAGE};
use crate::view::{CheckpointSource, ExplorerSources, ExplorerView};

// ========================================
// Commands
// ========================================

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Navigate(NavTarget),
    /// Page typed into the page field, unparsed
    GoTo(String),
    Open(u64),
    Search(String),
    Back,
    Forward,
    Refresh,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: open <checkpoint index>")]
    InvalidIndex,
}

impl Command {
    /// Parse a command line; `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "n" | "next" => Command::Navigate(NavTarget::Next),
            "p" | "prev" | "previous" => Command::Navigate(NavTarget::Previous),
            "f" | "first" => Command::Navigate(NavTarget::First),
            "l" | "last" => Command::Navigate(NavTarget::Last),
            "g" | "go" | "page" => Command::GoTo(rest.to_string()),
            "open" => Command::Open(rest.parse().map_err(|_| CommandError::InvalidIndex)?),
            "s" | "search" => Command::Search(rest.to_string()),
            "b" | "back" => Command::Back,
            "fw" | "forward" => Command::Forward,
            "r" | "refresh" => Command::Refresh,
            "q" | "quit" | "exit" => Command::Quit,
            _ if parse_page_input(line).is_some() => Command::GoTo(line.to_string()),
            _ => return Err(CommandError::Unknown(word.to_string())),
        };
        Ok(Some(command))
    }
}

// ========================================
// Events
// ========================================

/// Work finished off the session task
#[derive(Debug)]
pub enum ViewEvent {
    FetchCompleted {
        epoch: u64,
        completion: FetchCompletion<Checkpoint>,
    },
    SearchCompleted {
        seq: u64,
        result: Result<SearchOutcome, FetchError>,
    },
    RefreshTick {
        generation: u64,
    },
}

/// Whether the loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

enum Wakeup {
    Event(ViewEvent),
    AlertExpired,
}

async fn next_wakeup(
    events: &mut mpsc::UnboundedReceiver<ViewEvent>,
    alert_deadline: Option<Instant>,
) -> Option<Wakeup> {
    match alert_deadline {
        Some(deadline) => tokio::select! {
            event = events.recv() => event.map(Wakeup::Event),
            _ = sleep_until(deadline) => Some(Wakeup::AlertExpired),
        },
        None => events.recv().await.map(Wakeup::Event),
    }
}

// ========================================
// Session
// ========================================

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Rows per page on the list view
    pub page_size: u64,
    /// `None` disables periodic refresh
    pub refresh_interval: Option<Duration>,
    pub alert_duration: Duration,
    pub environment: String,
    pub links: ExplorerLinks,
}

impl SessionOptions {
    pub fn from_config(config: &ExplorerConfig) -> Self {
        Self {
            page_size: config.page_size,
            refresh_interval: config.refresh_interval,
            alert_duration: ALERT_DURATION,
            environment: config.environment.clone(),
            links: ExplorerLinks::new(
                config.l1_explorer_base_url.clone(),
                config.l2_explorer_base_url.clone(),
            ),
        }
    }
}

struct MountedView {
    view: ExplorerView,
    epoch: u64,
    source: CheckpointSource,
    controller: PaginationController<Checkpoint>,
}

pub struct ExplorerSession<S: Surface> {
    sources: ExplorerSources,
    options: SessionOptions,
    surface: S,
    location: QueryStateSync,
    mounted: Option<MountedView>,
    alert: AlertSlot,
    refresher: Option<PeriodicRefresher>,
    epoch: u64,
    refresh_generation: u64,
    search_seq: u64,
    updated_at: Option<DateTime<Local>>,
    events_tx: mpsc::UnboundedSender<ViewEvent>,
    events_rx: mpsc::UnboundedReceiver<ViewEvent>,
}

impl<S: Surface> ExplorerSession<S> {
    pub fn new(sources: ExplorerSources, options: SessionOptions, surface: S) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let alert = AlertSlot::new(options.alert_duration);

        Self {
            sources,
            options,
            surface,
            location: QueryStateSync::new(),
            mounted: None,
            alert,
            refresher: None,
            epoch: 0,
            refresh_generation: 0,
            search_seq: 0,
            updated_at: None,
            events_tx,
            events_rx,
        }
    }

    // ----- accessors -----

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn location(&self) -> &QueryStateSync {
        &self.location
    }

    pub fn current_view(&self) -> Option<ExplorerView> {
        self.mounted.as_ref().map(|m| m.view)
    }

    pub fn controller(&self) -> Option<&PaginationController<Checkpoint>> {
        self.mounted.as_ref().map(|m| &m.controller)
    }

    pub fn alert_message(&self) -> Option<&str> {
        self.alert.message()
    }

    pub fn refresher_active(&self) -> bool {
        self.refresher.as_ref().is_some_and(|r| !r.is_cancelled())
    }

    // ----- lifecycle -----

    /// Enter the explorer at `url` (a deep link creates a history entry)
    pub fn start(&mut self, url: Url) {
        info!(location = %display_location(&url), "Opening explorer");
        self.location.open(url);
        self.mount_current();
        self.render();
    }

    /// Run until quit, end of input or `shutdown`
    pub async fn run(
        mut self,
        mut input: mpsc::UnboundedReceiver<String>,
        shutdown: CancellationToken,
    ) -> S {
        loop {
            let deadline = self.alert.deadline();
            let flow = tokio::select! {
                _ = shutdown.cancelled() => Flow::Exit,
                line = input.recv() => match line {
                    Some(line) => self.handle_line(&line),
                    None => {
                        debug!("Input closed");
                        Flow::Exit
                    }
                },
                wakeup = next_wakeup(&mut self.events_rx, deadline) => {
                    self.apply_wakeup(wakeup);
                    Flow::Continue
                }
            };

            if flow == Flow::Exit {
                break;
            }
        }

        self.teardown();
        self.surface
    }

    /// Wait for the next fetch result, search result, refresh tick or alert
    /// expiry and apply it
    pub async fn step(&mut self) {
        let deadline = self.alert.deadline();
        let wakeup = next_wakeup(&mut self.events_rx, deadline).await;
        self.apply_wakeup(wakeup);
    }

    /// Stop all background work of the mounted view
    pub fn teardown(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.cancel();
        }
        self.alert.clear();
        self.epoch += 1;
        self.mounted = None;
        info!("Explorer view torn down");
    }

    // ----- input -----

    pub fn handle_line(&mut self, line: &str) -> Flow {
        match Command::parse(line) {
            Ok(Some(command)) => self.handle_command(command),
            Ok(None) => {
                self.render();
                Flow::Continue
            }
            Err(err) => {
                self.show_alert(err.to_string());
                self.render();
                Flow::Continue
            }
        }
    }

    pub fn handle_command(&mut self, command: Command) -> Flow {
        debug!(?command, "Command");

        let flow = match command {
            Command::Navigate(target) => {
                self.page_change(|controller| controller.navigate(target));
                Flow::Continue
            }
            Command::GoTo(input) => {
                self.page_change(|controller| controller.submit_input(&input));
                Flow::Continue
            }
            Command::Open(idx) => {
                self.open_checkpoint(idx);
                Flow::Continue
            }
            Command::Search(query) => {
                self.search(&query);
                Flow::Continue
            }
            Command::Back => {
                let traversal = self.location.back();
                self.after_traversal(traversal, "No earlier page")
            }
            Command::Forward => {
                let traversal = self.location.forward();
                self.after_traversal(traversal, "No later page")
            }
            Command::Refresh => {
                self.refresh_current();
                Flow::Continue
            }
            Command::Quit => Flow::Exit,
        };

        if flow == Flow::Continue {
            self.render();
        }
        flow
    }

    fn page_change<F>(&mut self, request: F)
    where
        F: FnOnce(&mut PaginationController<Checkpoint>) -> Result<FetchRequest, NavigationError>,
    {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };

        match request(&mut mounted.controller) {
            Ok(fetch) => {
                self.spawn_fetch(fetch);
                self.restart_refresher();
            }
            Err(err) => {
                debug!(error = %err, "Page request rejected");
                self.show_alert(err.to_string());
            }
        }
    }

    fn open_checkpoint(&mut self, idx: u64) {
        match ExplorerView::CheckpointDetail.location(idx) {
            Ok(url) => {
                self.location.open(url);
                self.mount_current();
            }
            Err(err) => self.show_alert(err.to_string()),
        }
    }

    fn search(&mut self, raw: &str) {
        let Some(query) = prepare_query(raw) else {
            self.show_alert(EMPTY_QUERY_MESSAGE);
            return;
        };

        self.search_seq += 1;
        let seq = self.search_seq;
        let source = self.sources.search.clone();
        let events = self.events_tx.clone();
        let query = query.to_string();

        tokio::spawn(async move {
            let result = source.search(&query).await;
            let _ = events.send(ViewEvent::SearchCompleted { seq, result });
        });
    }

    fn after_traversal(&mut self, traversal: Traversal, blocked_message: &str) -> Flow {
        match traversal {
            Traversal::Moved(url) => {
                debug!(location = %display_location(&url), "History traversal");
                self.on_popstate();
                Flow::Continue
            }
            Traversal::Left => {
                info!("Navigated back out of the explorer");
                Flow::Exit
            }
            Traversal::Blocked => {
                self.show_alert(blocked_message);
                Flow::Continue
            }
        }
    }

    fn refresh_current(&mut self) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if let Some(fetch) = mounted.controller.refresh() {
            self.spawn_fetch(fetch);
        }
    }

    // ----- events -----

    fn apply_wakeup(&mut self, wakeup: Option<Wakeup>) {
        match wakeup {
            Some(Wakeup::Event(event)) => self.handle_event(event),
            Some(Wakeup::AlertExpired) => {
                if self.alert.expire(Instant::now()) {
                    self.render();
                }
            }
            None => {}
        }
    }

    pub fn handle_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::FetchCompleted { epoch, completion } => {
                let Some(mounted) = self.mounted.as_mut().filter(|m| m.epoch == epoch) else {
                    debug!(epoch, page = completion.ticket.page, "Dropping result for unmounted view");
                    return;
                };

                let outcome = mounted
                    .controller
                    .on_fetch_completed(completion, &mut self.location);
                if let CompletionOutcome::Applied { .. } = outcome {
                    self.updated_at = Some(Local::now());
                }
            }
            ViewEvent::SearchCompleted { seq, result } => {
                if seq != self.search_seq {
                    debug!(seq, "Dropping superseded search result");
                    return;
                }
                match result {
                    Ok(SearchOutcome::Found(idx)) => {
                        info!(idx, "Search matched checkpoint");
                        self.open_checkpoint(idx);
                    }
                    Ok(SearchOutcome::NotFound(message)) => self.show_alert(message),
                    Err(err) => {
                        warn!(error = %err, "Search failed");
                        self.show_alert(err.to_string());
                    }
                }
            }
            ViewEvent::RefreshTick { generation } => {
                if generation != self.refresh_generation || !self.refresher_active() {
                    debug!(generation, "Dropping tick from cancelled refresher");
                    return;
                }
                self.refresh_current();
            }
        }

        self.render();
    }

    // ----- mounting -----

    /// Mount the view for the current location and load its page
    fn mount_current(&mut self) {
        let Some(url) = self.location.location().cloned() else {
            return;
        };

        let view = match ExplorerView::from_location(&url) {
            Some(view) => view,
            None => {
                warn!(location = %display_location(&url), "Unknown path, showing checkpoint list");
                if let Ok(root) = ExplorerView::Checkpoints.location(ExplorerView::Checkpoints.first_page()) {
                    self.location.redirect(root);
                }
                ExplorerView::Checkpoints
            }
        };

        self.epoch += 1;
        let controller = PaginationController::new(view.page_size(self.options.page_size));
        self.mounted = Some(MountedView {
            view,
            epoch: self.epoch,
            source: self.sources.for_view(view),
            controller,
        });
        info!(view = view.title(), epoch = self.epoch, "View mounted");

        self.load_from_location();
    }

    /// Back/forward landed on a new entry
    fn on_popstate(&mut self) {
        let same_view = match (self.location.location(), self.current_view()) {
            (Some(url), Some(view)) => ExplorerView::from_location(url) == Some(view),
            _ => false,
        };

        if same_view {
            self.load_from_location();
        } else {
            self.mount_current();
        }
    }

    /// Fetch the page named in the URL, without bounds checking
    fn load_from_location(&mut self) {
        let page = self.location.read_initial();
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };

        let page = page.unwrap_or_else(|| mounted.view.first_page());
        let fetch = mounted.controller.load(page);
        self.spawn_fetch(fetch);
        self.restart_refresher();
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let Some(mounted) = self.mounted.as_ref() else {
            return;
        };

        let epoch = mounted.epoch;
        let source = mounted.source.clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let completion = execute(source.as_ref(), request).await;
            let _ = events.send(ViewEvent::FetchCompleted { epoch, completion });
        });
    }

    fn restart_refresher(&mut self) {
        if let Some(previous) = self.refresher.take() {
            previous.cancel();
        }
        let Some(period) = self.options.refresh_interval else {
            return;
        };

        self.refresh_generation += 1;
        self.refresher = Some(PeriodicRefresher::spawn(
            period,
            self.refresh_generation,
            self.events_tx.clone(),
            |generation| ViewEvent::RefreshTick { generation },
        ));
    }

    // ----- output -----

    fn show_alert(&mut self, message: impl Into<String>) {
        let alert = self.alert.show(message, Instant::now());
        info!(alert = %alert.message, "Alert shown");
    }

    fn render(&mut self) {
        let Some(mounted) = self.mounted.as_ref() else {
            return;
        };

        let controller = &mounted.controller;
        let frame = Frame {
            view: mounted.view,
            location: self.location.location().map(display_location),
            items: controller.page_result().map(|r| r.items()),
            controls: controller.controls(),
            loading: controller.is_loading(),
            error: controller.error_message(),
            alert: self.alert.message(),
            environment: &self.options.environment,
            updated_at: self.updated_at,
            links: &self.options.links,
        };

        if let Err(err) = self.surface.draw(&frame) {
            warn!(error = %err, "Failed to draw frame");
        }
    }
}
