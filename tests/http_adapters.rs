// tests/http_adapters.rs
mod common;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::*;
use keeput_analyzer::fetch::providers::{hatena, zenn};
use keeput_analyzer::lock::http::{HttpLocker, API_KEY_HEADER};
use keeput_analyzer::notify::{DiscordNotifier, SlackNotifier, MSG_ACHIEVED, MSG_NOT_ACHIEVED};
use keeput_analyzer::{AnalysisReport, EntryFetcher, Locker, Notifier, Platform};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const HATENA_XML: &str = include_str!("fixtures/hatena_atom.xml");
const ZENN_XML: &str = include_str!("fixtures/zenn_rss.xml");

// ---- lock worker ----

#[derive(Clone, Default)]
struct LockWorker {
    held: Arc<Mutex<HashSet<String>>>,
    keys: Arc<Mutex<Vec<String>>>,
    // Number of leading requests answered with 500.
    fail_first: Arc<AtomicUsize>,
}

#[derive(Deserialize)]
struct LockBody {
    #[serde(rename = "lockId")]
    lock_id: String,
}

impl LockWorker {
    fn note(&self, headers: &HeaderMap) -> bool {
        let key = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.keys.lock().unwrap().push(key);
        let pending = self.fail_first.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_first.store(pending - 1, Ordering::SeqCst);
            return false;
        }
        true
    }
}

async fn worker_acquire(
    State(w): State<LockWorker>,
    headers: HeaderMap,
    Json(body): Json<LockBody>,
) -> Result<Json<Value>, StatusCode> {
    if !w.note(&headers) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let fresh = w.held.lock().unwrap().insert(body.lock_id);
    Ok(Json(json!({ "msg": if fresh { "ok" } else { "ng" } })))
}

async fn worker_release(
    State(w): State<LockWorker>,
    headers: HeaderMap,
    Json(body): Json<LockBody>,
) -> Result<Json<Value>, StatusCode> {
    if !w.note(&headers) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let removed = w.held.lock().unwrap().remove(&body.lock_id);
    Ok(Json(json!({ "msg": if removed { "ok" } else { "ng" } })))
}

async fn lock_worker(w: LockWorker) -> String {
    let app = Router::new()
        .route("/acquire", post(worker_acquire))
        .route("/release", post(worker_release))
        .with_state(w);
    serve(app).await
}

#[tokio::test]
async fn http_locker_acquires_once_per_id() {
    let worker = LockWorker::default();
    let base = lock_worker(worker.clone()).await;
    let locker = HttpLocker::new(format!("{base}/"), "secret", Client::new());
    let cancel = CancellationToken::new();

    assert!(locker.acquire(&cancel, "usecase:analyze:2025-01-10").await.unwrap());
    assert!(!locker.acquire(&cancel, "usecase:analyze:2025-01-10").await.unwrap());
    assert!(locker.acquire(&cancel, "usecase:analyze:2025-01-11").await.unwrap());

    locker.release(&cancel, "usecase:analyze:2025-01-10").await.unwrap();
    assert!(locker.acquire(&cancel, "usecase:analyze:2025-01-10").await.unwrap());

    assert!(worker.keys.lock().unwrap().iter().all(|k| k == "secret"));
}

#[tokio::test]
async fn http_locker_release_of_unknown_id_is_an_error() {
    let base = lock_worker(LockWorker::default()).await;
    let locker = HttpLocker::new(base, "secret", Client::new());

    let err = locker
        .release(&CancellationToken::new(), "usecase:analyze:2025-01-10")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("refused release"), "{err:#}");
}

#[tokio::test]
async fn http_locker_reports_server_errors() {
    let worker = LockWorker::default();
    worker.fail_first.store(usize::MAX, Ordering::SeqCst);
    let base = lock_worker(worker).await;
    let locker = HttpLocker::new(base, "secret", Client::new()).with_retries(1);

    let err = locker
        .acquire(&CancellationToken::new(), "usecase:analyze:2025-01-10")
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("500"), "{err:#}");
}

#[tokio::test]
async fn http_locker_retries_transient_server_errors() {
    let worker = LockWorker::default();
    worker.fail_first.store(1, Ordering::SeqCst);
    let base = lock_worker(worker.clone()).await;
    let locker = HttpLocker::new(base, "secret", Client::new()).with_retries(2);

    assert!(locker
        .acquire(&CancellationToken::new(), "usecase:analyze:2025-01-10")
        .await
        .unwrap());
    assert_eq!(worker.keys.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn http_locker_unreachable_is_an_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let locker = HttpLocker::new(format!("http://{addr}"), "k", Client::new()).with_retries(1);
    assert!(locker
        .acquire(&CancellationToken::new(), "usecase:analyze:2025-01-10")
        .await
        .is_err());
}

// ---- webhooks ----

#[derive(Clone)]
struct Hook {
    status: StatusCode,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn hook_handler(
    State(h): State<Hook>,
    Json(body): Json<Value>,
) -> (StatusCode, &'static str) {
    h.bodies.lock().unwrap().push(body);
    let text = if h.status.is_success() { "" } else { "bad payload" };
    (h.status, text)
}

async fn webhook(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
    let bodies = Arc::new(Mutex::new(vec![]));
    let app = Router::new().route("/hook", post(hook_handler)).with_state(Hook {
        status,
        bodies: bodies.clone(),
    });
    (format!("{}/hook", serve(app).await), bodies)
}

fn achieved_report() -> AnalysisReport {
    AnalysisReport {
        is_goal_achieved: true,
        latest_entry: Some(entry("Hello", utc(2025, 1, 8, 12, 0, 0), Platform::ZENN)),
    }
}

#[tokio::test]
async fn discord_posts_content() {
    let (url, bodies) = webhook(StatusCode::NO_CONTENT).await;
    let n = DiscordNotifier::new(url, Client::new());

    n.notify(&CancellationToken::new(), &achieved_report()).await.unwrap();

    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let content = bodies[0]["content"].as_str().unwrap();
    assert!(content.starts_with(MSG_ACHIEVED));
    assert!(content.contains("Hello (zenn, 2025-01-08)"));
}

#[tokio::test]
async fn discord_client_error_is_not_retried() {
    let (url, bodies) = webhook(StatusCode::BAD_REQUEST).await;
    let n = DiscordNotifier::new(url, Client::new());

    let err = n
        .notify(&CancellationToken::new(), &achieved_report())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("bad payload"), "{err:#}");
    assert_eq!(bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn slack_posts_text() {
    let (url, bodies) = webhook(StatusCode::OK).await;
    let n = SlackNotifier::new(url, Client::new());
    let report = AnalysisReport {
        is_goal_achieved: false,
        latest_entry: None,
    };

    n.notify(&CancellationToken::new(), &report).await.unwrap();

    assert_eq!(bodies.lock().unwrap()[0], json!({ "text": MSG_NOT_ACHIEVED }));
}

#[tokio::test]
async fn slack_error_status_fails() {
    let (url, _) = webhook(StatusCode::FORBIDDEN).await;
    let n = SlackNotifier::new(url, Client::new());
    assert!(n
        .notify(&CancellationToken::new(), &achieved_report())
        .await
        .is_err());
}

// ---- feeds ----

#[derive(Clone, Default)]
struct FeedLog {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn hatena_feed(
    State(log): State<FeedLog>,
    Query(q): Query<HashMap<String, String>>,
) -> ([(header::HeaderName, &'static str); 1], &'static str) {
    log.queries.lock().unwrap().push(q);
    ([(header::CONTENT_TYPE, "application/atom+xml")], HATENA_XML)
}

async fn zenn_feed() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "application/rss+xml")], ZENN_XML)
}

async fn missing_feed() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn feed_server(log: FeedLog) -> String {
    let app = Router::new()
        .route("/hatena/feed", get(hatena_feed))
        .route("/zenn/feed", get(zenn_feed))
        .route("/gone/feed", get(missing_feed))
        .with_state(log);
    serve(app).await
}

#[tokio::test]
async fn hatena_feed_asks_for_newest_entry_only() {
    let log = FeedLog::default();
    let base = feed_server(log.clone()).await;
    let f = hatena::from_url(&format!("{base}/hatena/feed?size=10"), Client::new()).unwrap();

    let e = f.fetch_latest(&CancellationToken::new()).await.unwrap().unwrap();

    assert_eq!(e.title, "Rewriting the analyzer in Rust");
    assert_eq!(e.body, "Full body of the rewrite post.");
    assert_eq!(e.platform, Platform::HATENA);
    assert_eq!(e.published_at, utc(2025, 1, 8, 12, 10, 0));
    let queries = log.queries.lock().unwrap();
    assert_eq!(queries[0].get("size").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn zenn_feed_yields_newest_item() {
    let base = feed_server(FeedLog::default()).await;
    let f = zenn::from_url(&format!("{base}/zenn/feed"), Client::new());

    let e = f.fetch_latest(&CancellationToken::new()).await.unwrap().unwrap();

    assert_eq!(e.title, "Concurrent fan-out with JoinSet");
    assert_eq!(e.platform, Platform::ZENN);
    assert_eq!(e.published_at, utc(2025, 1, 6, 10, 0, 0));
}

#[tokio::test]
async fn missing_feed_is_an_error() {
    let base = feed_server(FeedLog::default()).await;
    let f = zenn::from_url(&format!("{base}/gone/feed"), Client::new());

    let err = f.fetch_latest(&CancellationToken::new()).await.unwrap_err();
    assert!(err.to_string().contains("404"), "{err:#}");
}

#[tokio::test]
async fn fixture_fetchers_read_bundled_feeds() {
    let h = hatena::from_fixture(HATENA_XML)
        .fetch_latest(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    let z = zenn::from_fixture(ZENN_XML)
        .fetch_latest(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert!(h.published_at > z.published_at);
}
