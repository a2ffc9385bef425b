//! Integration tests against an in-process mock of the explorer API
//!
//! Tests cover:
//! - first load of the checkpoint list, then paging with URL sync
//! - out-of-range page input alert and its dismissal
//! - responses arriving out of order (last write wins)
//! - malformed bodies and HTTP errors keeping the previous page
//! - search redirect and search error
//! - checkpoint detail view on the 0-based endpoint

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use explorer_common::api::SearchOutcome;
use explorer_common::config::{ConfigOverrides, ExplorerConfig, TomlConfig};
use explorer_common::{Checkpoint, CommitmentInfo, ConfirmationStatus};
use explorer_ui::fetcher::{build_http_client, FetchError, HttpPageSource, PageSource};
use explorer_ui::location::{app_url, display_location};
use explorer_ui::render::{render_text, Frame, Surface};
use explorer_ui::search::{HttpSearchSource, SearchSource};
use explorer_ui::{ControllerState, ExplorerSession, ExplorerSources, ExplorerView, SessionOptions};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Mock API
// =============================================================================

const MODE_NORMAL: u8 = 0;
const MODE_MALFORMED: u8 = 1;
const MODE_SERVER_ERROR: u8 = 2;

struct MockApi {
    checkpoint_count: u64,
    mode: AtomicU8,
    delays: Mutex<HashMap<u64, Duration>>,
    requests: Mutex<Vec<String>>,
}

impl MockApi {
    fn new(checkpoint_count: u64) -> Arc<Self> {
        Arc::new(Self {
            checkpoint_count,
            mode: AtomicU8::new(MODE_NORMAL),
            delays: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn set_mode(&self, mode: u8) {
        self.mode.store(mode, Ordering::SeqCst);
    }

    fn delay_page(&self, page: u64, delay: Duration) {
        self.delays.lock().unwrap().insert(page, delay);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, path: &str, query: &PageQuery) {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{}?p={}&ps={}", path, query.p, query.ps));
    }

    async fn delay_for(&self, page: u64) {
        let delay = self.delays.lock().unwrap().get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn failure(&self) -> Option<Response> {
        match self.mode.load(Ordering::SeqCst) {
            MODE_MALFORMED => Some((StatusCode::OK, "{\"result\": {\"items\": oops").into_response()),
            MODE_SERVER_ERROR => {
                Some((StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response())
            }
            _ => None,
        }
    }
}

fn checkpoint(idx: u64) -> Checkpoint {
    Checkpoint {
        idx,
        l1_range: (idx * 10 + 1, idx * 10 + 10),
        l2_range: (idx * 100 + 1, idx * 100 + 100),
        l2_blockid: format!("{:064x}", idx + 1),
        commitment: Some(CommitmentInfo {
            blockhash: format!("{:064x}", idx + 1000),
            txid: format!("{:064x}", idx + 2000),
            wtxid: String::new(),
            height: idx * 10 + 11,
            position: 0,
        }),
        confirmation_status: Some(ConfirmationStatus::Finalized),
    }
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    p: u64,
    ps: u64,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: String,
}

async fn list_handler(State(api): State<Arc<MockApi>>, Query(query): Query<PageQuery>) -> Response {
    api.record("/api/checkpoints", &query);
    api.delay_for(query.p).await;
    if let Some(failure) = api.failure() {
        return failure;
    }

    let page_size = query.ps.max(1);
    let total_pages = api.checkpoint_count.div_ceil(page_size);
    let start = query.p.saturating_sub(1) * page_size;
    let end = (start + page_size).min(api.checkpoint_count);
    let items: Vec<Checkpoint> = (start..end).map(checkpoint).collect();

    Json(json!({
        "result": {
            "current_page": query.p,
            "total_pages": total_pages,
            "absolute_first_page": 1,
            "items": items,
        }
    }))
    .into_response()
}

async fn detail_handler(State(api): State<Arc<MockApi>>, Query(query): Query<PageQuery>) -> Response {
    api.record("/api/checkpoint", &query);
    api.delay_for(query.p).await;
    if let Some(failure) = api.failure() {
        return failure;
    }

    let items: Vec<Checkpoint> = if query.p < api.checkpoint_count {
        vec![checkpoint(query.p)]
    } else {
        Vec::new()
    };

    Json(json!({
        "result": {
            "current_page": query.p,
            "total_pages": api.checkpoint_count.saturating_sub(1),
            "absolute_first_page": 0,
            "items": items,
        }
    }))
    .into_response()
}

/// Block numbers map to the checkpoint covering them; anything else is an error
async fn search_handler(
    State(api): State<Arc<MockApi>>,
    Query(query): Query<SearchQuery>,
) -> Json<serde_json::Value> {
    match query.query.trim().parse::<u64>() {
        Ok(height) if height > 0 && (height - 1) / 10 < api.checkpoint_count => {
            Json(json!({ "result": (height - 1) / 10 }))
        }
        _ => Json(json!({ "error": "Invalid search entry" })),
    }
}

async fn spawn_mock(api: Arc<MockApi>) -> SocketAddr {
    let app = Router::new()
        .route("/api/checkpoints", get(list_handler))
        .route("/api/checkpoint", get(detail_handler))
        .route("/api/search", get(search_handler))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// =============================================================================
// Session helpers
// =============================================================================

#[derive(Default)]
struct RecordingSurface {
    frames: Vec<String>,
}

impl RecordingSurface {
    fn last(&self) -> &str {
        self.frames.last().map(String::as_str).unwrap_or("")
    }
}

impl Surface for RecordingSurface {
    fn draw(&mut self, frame: &Frame<'_>) -> std::io::Result<()> {
        self.frames.push(render_text(frame));
        Ok(())
    }
}

fn test_config(addr: SocketAddr) -> ExplorerConfig {
    ExplorerConfig::resolve(
        TomlConfig::default(),
        ConfigOverrides {
            api_base_url: Some(format!("http://{}", addr)),
            refresh_interval_s: Some(0),
            ..Default::default()
        },
    )
    .unwrap()
}

async fn session_for(addr: SocketAddr) -> ExplorerSession<RecordingSurface> {
    let config = test_config(addr);
    let sources = ExplorerSources::http(&config).unwrap();
    let mut options = SessionOptions::from_config(&config);
    options.alert_duration = Duration::from_millis(300);
    ExplorerSession::new(sources, options, RecordingSurface::default())
}

async fn step(session: &mut ExplorerSession<RecordingSurface>) {
    tokio::time::timeout(Duration::from_secs(5), session.step())
        .await
        .expect("session event within timeout");
}

/// Process events until no fetch is in flight
async fn settle(session: &mut ExplorerSession<RecordingSurface>) {
    for _ in 0..10 {
        if !session.controller().is_some_and(|c| c.is_loading()) {
            return;
        }
        step(session).await;
    }
    panic!("fetch did not settle");
}

fn location_of(session: &ExplorerSession<RecordingSurface>) -> String {
    session
        .location()
        .location()
        .map(display_location)
        .unwrap_or_default()
}

// =============================================================================
// Paging
// =============================================================================

#[tokio::test]
async fn test_first_load_then_next_page() {
    let api = MockApi::new(50);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/").unwrap());
    step(&mut session).await;

    let frame = session.surface().last().to_string();
    assert!(frame.contains("Page 1 of 5"), "{}", frame);
    assert_eq!(frame.lines().filter(|l| l.contains("finalized")).count(), 10);
    assert_eq!(location_of(&session), "/?p=1");

    session.handle_line("next");
    step(&mut session).await;

    assert_eq!(
        api.requests(),
        vec!["/api/checkpoints?p=1&ps=10", "/api/checkpoints?p=2&ps=10"]
    );
    assert_eq!(location_of(&session), "/?p=2");
    assert!(session.surface().last().contains("Page 2 of 5"));
    assert_eq!(session.location().history().len(), 1);
}

#[tokio::test]
async fn test_out_of_range_input_alerts_without_fetch() {
    let api = MockApi::new(50);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/?p=2").unwrap());
    step(&mut session).await;

    session.handle_line("99");
    assert_eq!(
        session.alert_message(),
        Some("Please enter values between 1 and 5")
    );
    assert_eq!(api.requests().len(), 1);

    step(&mut session).await;
    assert!(session.alert_message().is_none());
    assert_eq!(location_of(&session), "/?p=2");
    assert_eq!(session.controller().unwrap().current_page(), Some(2));
    assert!(!session.surface().last().contains("!!"));
}

#[tokio::test]
async fn test_slow_earlier_response_is_discarded() {
    let api = MockApi::new(90);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/").unwrap());
    step(&mut session).await;

    api.delay_page(3, Duration::from_millis(400));
    session.handle_line("3");
    session.handle_line("5");

    step(&mut session).await;
    assert_eq!(session.controller().unwrap().current_page(), Some(5));

    step(&mut session).await;
    assert_eq!(session.controller().unwrap().current_page(), Some(5));
    assert_eq!(location_of(&session), "/?p=5");
    assert!(session.surface().last().contains("Page 5 of 9"));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_malformed_body_keeps_previous_page() {
    let api = MockApi::new(50);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/").unwrap());
    step(&mut session).await;

    api.set_mode(MODE_MALFORMED);
    session.handle_line("n");
    step(&mut session).await;

    let controller = session.controller().unwrap();
    assert!(matches!(controller.state(), ControllerState::Error { .. }));
    assert_eq!(controller.current_page(), Some(1));
    assert_eq!(location_of(&session), "/?p=1");
    let frame = session.surface().last();
    assert!(frame.contains("Error: Malformed response"));
    assert!(frame.contains("Page 1 of 5"));

    // Recovers on the next successful fetch
    api.set_mode(MODE_NORMAL);
    session.handle_line("n");
    step(&mut session).await;
    assert_eq!(session.controller().unwrap().state(), &ControllerState::Idle);
    assert_eq!(location_of(&session), "/?p=2");
}

#[tokio::test]
async fn test_server_error_keeps_previous_page() {
    let api = MockApi::new(50);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/?p=3").unwrap());
    step(&mut session).await;

    api.set_mode(MODE_SERVER_ERROR);
    session.handle_line("refresh");
    step(&mut session).await;

    let controller = session.controller().unwrap();
    assert_eq!(
        controller.error_message(),
        Some("API error 500: database unavailable")
    );
    assert_eq!(controller.current_page(), Some(3));
}

#[tokio::test]
async fn test_failed_back_navigation_does_not_show_other_entry() {
    let api = MockApi::new(12);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/checkpoint?p=3").unwrap());
    settle(&mut session).await;
    session.handle_line("open 5");
    settle(&mut session).await;
    assert_eq!(location_of(&session), "/checkpoint?p=5");

    api.set_mode(MODE_SERVER_ERROR);
    session.handle_line("back");
    settle(&mut session).await;

    assert_eq!(location_of(&session), "/checkpoint?p=3");
    let controller = session.controller().unwrap();
    assert!(controller.page_result().is_none());
    assert!(controller.error_message().is_some());
    let frame = session.surface().last();
    assert!(frame.contains("API error 500"), "{}", frame);
    assert!(!frame.contains("Page 5 of"), "{}", frame);

    // Refresh retries the page named in the URL
    api.set_mode(MODE_NORMAL);
    session.handle_line("refresh");
    settle(&mut session).await;
    assert_eq!(session.controller().unwrap().current_page(), Some(3));
    assert_eq!(location_of(&session), "/checkpoint?p=3");
}

#[tokio::test]
async fn test_deep_link_past_the_end_steps_back_to_last_page() {
    let api = MockApi::new(50);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/?p=99").unwrap());
    settle(&mut session).await;
    assert!(session.controller().unwrap().controls().previous);

    session.handle_line("prev");
    assert!(session.alert_message().is_none());
    settle(&mut session).await;

    assert_eq!(location_of(&session), "/?p=5");
    assert!(session.surface().last().contains("Page 5 of 5"));
}

#[tokio::test]
async fn test_http_source_errors() {
    let api = MockApi::new(20);
    let addr = spawn_mock(api.clone()).await;
    let client = build_http_client(Duration::from_secs(5)).unwrap();
    let source: HttpPageSource<Checkpoint> = HttpPageSource::new(
        client,
        format!("http://{}/api/checkpoints", addr).parse().unwrap(),
    );

    let page = source.fetch_page(2, 5).await.unwrap();
    assert_eq!(page.current_page(), 2);
    assert_eq!(page.metadata().total_pages, 4);
    assert_eq!(page.items()[0].idx, 5);

    api.set_mode(MODE_SERVER_ERROR);
    assert!(matches!(
        source.fetch_page(1, 5).await,
        Err(FetchError::Status { code: 500, .. })
    ));

    api.set_mode(MODE_MALFORMED);
    assert!(matches!(
        source.fetch_page(1, 5).await,
        Err(FetchError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() {
    // Bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source: HttpPageSource<Checkpoint> = HttpPageSource::new(
        build_http_client(Duration::from_secs(2)).unwrap(),
        format!("http://{}/api/checkpoints", addr).parse().unwrap(),
    );
    assert!(matches!(
        source.fetch_page(1, 10).await,
        Err(FetchError::Transport(_))
    ));
}

// =============================================================================
// Detail view and search
// =============================================================================

#[tokio::test]
async fn test_open_detail_and_page_through_indexes() {
    let api = MockApi::new(13);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/").unwrap());
    step(&mut session).await;

    session.handle_line("open 0");
    step(&mut session).await;
    assert_eq!(session.current_view(), Some(ExplorerView::CheckpointDetail));
    assert_eq!(location_of(&session), "/checkpoint?p=0");
    assert!(session.surface().last().contains("Page 0 of 12"));

    session.handle_line("prev");
    assert_eq!(session.alert_message(), Some("Already on the first page"));

    session.handle_line("last");
    settle(&mut session).await;
    assert_eq!(location_of(&session), "/checkpoint?p=12");
    assert!(api.requests().contains(&"/api/checkpoint?p=12&ps=1".to_string()));

    session.handle_line("13");
    assert_eq!(
        session.alert_message(),
        Some("Please enter values between 0 and 12")
    );

    session.handle_line("back");
    settle(&mut session).await;
    assert_eq!(session.current_view(), Some(ExplorerView::Checkpoints));
    assert_eq!(location_of(&session), "/?p=1");
}

#[tokio::test]
async fn test_search_redirects_to_detail() {
    let api = MockApi::new(30);
    let addr = spawn_mock(api.clone()).await;
    let mut session = session_for(addr).await;

    session.start(app_url("/").unwrap());
    step(&mut session).await;

    session.handle_line("search 125");
    step(&mut session).await;
    assert_eq!(session.current_view(), Some(ExplorerView::CheckpointDetail));
    settle(&mut session).await;
    assert_eq!(location_of(&session), "/checkpoint?p=12");
    assert!(session.surface().last().contains("Epoch index:"));

    session.handle_line("s not-a-block");
    step(&mut session).await;
    assert_eq!(session.alert_message(), Some("Invalid search entry"));
    assert_eq!(location_of(&session), "/checkpoint?p=12");
}

#[tokio::test]
async fn test_http_search_source() {
    let api = MockApi::new(5);
    let addr = spawn_mock(api).await;
    let source = HttpSearchSource::new(
        build_http_client(Duration::from_secs(5)).unwrap(),
        format!("http://{}/api/search", addr).parse().unwrap(),
    );

    assert_eq!(source.search("31").await.unwrap(), SearchOutcome::Found(3));
    assert_eq!(
        source.search("999").await.unwrap(),
        SearchOutcome::NotFound("Invalid search entry".to_string())
    );
}
