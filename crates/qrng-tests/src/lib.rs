//! Integration test support for the QRNG client.
//!
//! Each [`MockServer`] runs an axum router on its own tokio runtime, bound to
//! an ephemeral localhost port, so the blocking client under test can talk to
//! it from a plain `#[test]`.

use axum::Router;
use axum::extract::RawQuery;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use parking_lot::Mutex;
use serde_json::Value;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

/// API key used by every test client.
pub const TEST_API_KEY: &str = "qnrk_test_key";

/// Mock HTTP/WebSocket server running on a background thread.
pub struct MockServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockServer {
    /// Starts serving `router` on 127.0.0.1 with an ephemeral port.
    ///
    /// # Panics
    /// Panics if the listener or runtime cannot be created.
    #[must_use]
    pub fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        listener
            .set_nonblocking(true)
            .expect("set mock listener non-blocking");
        let addr = listener.local_addr().expect("mock server address");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("mock server runtime");
            runtime.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("tokio mock listener");
                let _ = axum::serve(listener, router)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await;
            });
        });

        Self {
            addr,
            shutdown: Some(shutdown_tx),
        }
    }

    /// Base URL for the REST client.
    #[must_use]
    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL for the streaming client.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Returns a base URL on which nothing is listening.
///
/// # Panics
/// Panics if no ephemeral port can be reserved.
#[must_use]
pub fn refused_url(scheme: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("reserve port");
    let addr = listener.local_addr().expect("reserved address");
    drop(listener);
    format!("{scheme}://{addr}")
}

// ============================================================================
// REST
// ============================================================================

/// One request seen by a REST route.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request path.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Value of the `X-API-Key` header, if sent.
    pub api_key: Option<String>,
}

/// Requests recorded by REST routes.
pub type RequestLog = Arc<Mutex<Vec<RecordedRequest>>>;

fn record(log: &RequestLog, uri: &Uri, headers: &HeaderMap) {
    log.lock().push(RecordedRequest {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        api_key: headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
}

/// Route answering every GET on `path` with `status` and a JSON body.
#[must_use]
pub fn json_route(path: &str, status: StatusCode, body: Value, log: RequestLog) -> Router {
    Router::new().route(
        path,
        get(move |uri: Uri, headers: HeaderMap| {
            let body = body.clone();
            let log = Arc::clone(&log);
            async move {
                record(&log, &uri, &headers);
                (status, axum::Json(body))
            }
        }),
    )
}

/// Route answering every GET on `path` with `status`, a content type and a
/// raw body.
#[must_use]
pub fn raw_route(path: &str, status: StatusCode, content_type: &'static str, body: &'static str) -> Router {
    Router::new().route(
        path,
        get(move || async move { (status, [("content-type", content_type)], body) }),
    )
}

/// Route that answers only after `delay`.
#[must_use]
pub fn slow_route(path: &str, delay: Duration, body: Value) -> Router {
    Router::new().route(
        path,
        get(move || {
            let body = body.clone();
            async move {
                tokio::time::sleep(delay).await;
                axum::Json(body)
            }
        }),
    )
}

// ============================================================================
// Streaming
// ============================================================================

/// What the mock stream does after authentication.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Send a text frame.
    Send(String),
    /// Wait before the next step.
    Pause(Duration),
}

/// How the mock stream ends once the script has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEnd {
    /// Send a close frame.
    Close,
    /// Keep the connection open until the client closes it.
    Hold,
    /// Drop the connection without a close frame.
    Reset,
}

/// Observations made by the mock stream endpoint.
#[derive(Debug, Default)]
pub struct StreamObservations {
    /// Raw query strings of each connection.
    pub queries: Vec<String>,
    /// First frame received on each connection.
    pub auth_messages: Vec<String>,
    /// Number of connections the client closed.
    pub client_closes: usize,
}

/// Shared stream observations.
pub type StreamLog = Arc<Mutex<StreamObservations>>;

/// Route serving `/api/stream` with a scripted sequence of frames.
#[must_use]
pub fn stream_route(steps: Vec<ScriptStep>, end: ScriptEnd, log: StreamLog) -> Router {
    Router::new().route(
        "/api/stream",
        get(move |ws: WebSocketUpgrade, RawQuery(query): RawQuery| {
            let steps = steps.clone();
            let log = Arc::clone(&log);
            async move {
                log.lock().queries.push(query.unwrap_or_default());
                ws.on_upgrade(move |socket| run_script(socket, steps, end, log))
                    .into_response()
            }
        }),
    )
}

async fn run_script(mut socket: WebSocket, steps: Vec<ScriptStep>, end: ScriptEnd, log: StreamLog) {
    match socket.recv().await {
        Some(Ok(Message::Text(auth))) => log.lock().auth_messages.push(auth.as_str().to_string()),
        _ => return,
    }

    for step in steps {
        match step {
            ScriptStep::Send(text) => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
            ScriptStep::Pause(delay) => tokio::time::sleep(delay).await,
        }
    }

    match end {
        ScriptEnd::Close => {
            let _ = socket.send(Message::Close(None)).await;
        }
        ScriptEnd::Reset => return,
        ScriptEnd::Hold => {}
    }
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Close(_)) => {
                if end == ScriptEnd::Hold {
                    log.lock().client_closes += 1;
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
}
