//! End-to-end tests of the HTTP client and viewer against a stub logs API.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use stack_logs::{
    FetchError, FetchMode, HttpClientConfig, HttpLogClient, LogLevel, LogQuery, LogSource, LogViewer,
    TargetSelector, ViewerConfig, resolve,
};
use tokio::net::TcpListener;

/// One request as seen by the stub.
#[derive(Debug, Clone)]
struct Seen {
    path: String,
    query: String,
    accept: Option<String>,
    cookie: Option<String>,
}

type Journal = Arc<Mutex<Vec<Seen>>>;

/// Stub logs API listening on an ephemeral port.
struct StubApi {
    addr: SocketAddr,
    journal: Journal,
}

impl StubApi {
    async fn start() -> Self {
        let journal = Journal::default();
        let app = Router::new().fallback(handle).with_state(journal.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, journal }
    }

    fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    fn client(&self) -> HttpLogClient {
        HttpLogClient::new(HttpClientConfig::new(self.base_url())).expect("valid config")
    }

    fn requests(&self) -> Vec<Seen> {
        self.journal.lock().expect("journal lock").clone()
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn handle(State(journal): State<Journal>, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path().to_string();
    journal.lock().expect("journal lock").push(Seen {
        path: path.clone(),
        query: uri.query().unwrap_or_default().to_string(),
        accept: header_value(&headers, header::ACCEPT),
        cookie: header_value(&headers, header::COOKIE),
    });

    let target = path.trim_end_matches("/logs").rsplit('/').next().unwrap_or_default().to_string();
    match target.as_str() {
        "missing" => (StatusCode::NOT_FOUND, axum::Json(json!({ "error": "container missing not found" })))
            .into_response(),
        "flaky" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        "garbled" => (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], "{\"logs\": [")
            .into_response(),
        "quiet" => axum::Json(json!({})).into_response(),
        _ => axum::Json(json!({
            "logs": [
                { "timestamp": "2024-05-01T10:00:01Z", "level": "info", "source": "web", "message": "listening" },
                { "timestamp": "2024-05-01T10:00:02Z", "level": "WARNING", "message": "slow query" },
                { "timestamp": "2024-05-01T10:00:03Z", "level": "verbose", "message": "unclassified" },
            ]
        }))
        .into_response(),
    }
}

fn shop() -> TargetSelector {
    TargetSelector::stack("srv-1", "shop").expect("valid selector")
}

// ===========================================
// Fetch Client Tests
// ===========================================

#[tokio::test]
async fn fetches_stack_logs_with_default_query() {
    let api = StubApi::start().await;
    let client = HttpLogClient::new(HttpClientConfig::new(api.base_url()).with_session_cookie("sid=abc123"))
        .expect("valid config");

    let logs = client
        .fetch(&resolve(&shop()), &LogQuery::default(), FetchMode::Blocking)
        .await
        .expect("fetch");

    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].source.as_deref(), Some("web"));
    assert_eq!(logs[1].level, Some(LogLevel::Warn));
    assert_eq!(logs[2].level, None);

    let seen = api.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/api/servers/srv-1/stacks/shop/logs");
    assert_eq!(seen[0].query, "tail=100&timestamps=true");
    assert_eq!(seen[0].accept.as_deref(), Some("application/json"));
    assert_eq!(seen[0].cookie.as_deref(), Some("sid=abc123"));
}

#[tokio::test]
async fn encodes_container_path_and_sends_since() {
    let api = StubApi::start().await;
    let selector = shop().with_container("web 1");
    let query = LogQuery::new(50, "5m", false).expect("valid query");

    api.client()
        .fetch(&resolve(&selector), &query, FetchMode::Silent)
        .await
        .expect("fetch");

    let seen = api.requests();
    assert_eq!(seen[0].path, "/api/servers/srv-1/stacks/shop/containers/web%201/logs");
    assert_eq!(seen[0].query, "tail=50&since=5m&timestamps=false");
    assert_eq!(seen[0].cookie, None);
}

#[tokio::test]
async fn service_path_and_missing_logs_field() {
    let api = StubApi::start().await;
    let selector = shop().with_service("quiet");

    let logs = api
        .client()
        .fetch(&resolve(&selector), &LogQuery::default(), FetchMode::Blocking)
        .await
        .expect("fetch");

    assert!(logs.is_empty());
    assert_eq!(api.requests()[0].path, "/api/servers/srv-1/stacks/shop/services/quiet/logs");
}

#[tokio::test]
async fn error_body_message_is_used() {
    let api = StubApi::start().await;
    let err = api
        .client()
        .fetch(&resolve(&shop().with_container("missing")), &LogQuery::default(), FetchMode::Blocking)
        .await
        .expect_err("404");

    assert_eq!(
        err,
        FetchError::Http {
            status: 404,
            message: "container missing not found".to_string(),
        }
    );
}

#[tokio::test]
async fn status_line_is_used_without_error_body() {
    let api = StubApi::start().await;
    let err = api
        .client()
        .fetch(&resolve(&shop().with_container("flaky")), &LogQuery::default(), FetchMode::Blocking)
        .await
        .expect_err("503");

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let api = StubApi::start().await;
    let err = api
        .client()
        .fetch(&resolve(&shop().with_container("garbled")), &LogQuery::default(), FetchMode::Blocking)
        .await
        .expect_err("bad body");

    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let api = StubApi::start().await;
    let client = HttpLogClient::new(HttpClientConfig::new(format!("http://{}/admin", api.addr))).expect("valid config");

    client
        .fetch(&resolve(&shop()), &LogQuery::default(), FetchMode::Blocking)
        .await
        .expect("fetch");

    assert_eq!(api.requests()[0].path, "/admin/api/servers/srv-1/stacks/shop/logs");
}

#[tokio::test]
async fn unreachable_api_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = HttpLogClient::new(HttpClientConfig::new(format!("http://{addr}/"))).expect("valid config");
    let err = client
        .fetch(&resolve(&shop()), &LogQuery::default(), FetchMode::Blocking)
        .await
        .expect_err("nothing listening");

    assert!(matches!(err, FetchError::Network(_)));
}

// ===========================================
// Viewer Tests
// ===========================================

#[tokio::test]
async fn viewer_loads_then_reports_blocking_failure() {
    let api = StubApi::start().await;
    let mut viewer = LogViewer::new(
        Arc::new(api.client()),
        shop(),
        LogQuery::default(),
        ViewerConfig::default().with_auto_refresh(false),
    );

    viewer.refresh().await;
    assert_eq!(viewer.buffer().len(), 3);
    assert_eq!(viewer.stats().warn, 1);
    assert_eq!(
        viewer.render_lines(None)[0],
        "[2024-05-01 10:00:01.000] INFO  web: listening"
    );

    viewer
        .set_selector(shop().with_container("missing"))
        .await
        .expect("selector changed");
    assert!(viewer.buffer().is_empty());
    assert_eq!(viewer.state().error.as_deref(), Some("container missing not found"));
    assert_eq!(api.requests().len(), 2);
}
