//! WebSocket streaming session for continuous entropy delivery.
//!
//! A [`QrngStreamClient`] owns at most one background worker. The worker is a
//! dedicated OS thread driving a single-threaded tokio runtime; every callback
//! runs on that thread, in the order frames arrive, and never concurrently.

use crate::error::Error;
use crate::types::{AuthMessage, StreamFrame, StreamOptions};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, warn};

#[cfg(test)]
mod tests;

/// Default streaming endpoint.
pub const DEFAULT_STREAM_URL: &str = "wss://qrngapi.com";

/// Default upper bound on how long [`QrngStreamClient::disconnect`] waits.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Streaming client configuration.
#[derive(Clone)]
pub struct StreamConfig {
    /// API key sent in the authentication frame.
    pub api_key: String,
    /// Base URL of the stream endpoint (e.g., "wss://qrngapi.com").
    pub base_url: String,
    /// How long `disconnect` waits for the worker before detaching it.
    pub shutdown_timeout: Duration,
}

impl StreamConfig {
    /// Creates a configuration with the default endpoint and shutdown timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_STREAM_URL.to_string(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Overrides the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

/// Lifecycle of a streaming session.
///
/// Errors are not a state: they are reported through the error callback and
/// never block a later `disconnect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected.
    Idle,
    /// Worker started, handshake or authentication in flight.
    Connecting,
    /// Authenticated and receiving chunks.
    Streaming,
    /// Connection finished; `connect` may be called again.
    Closed,
}

type DataCallback = Box<dyn FnMut(String) + Send>;
type ErrorCallback = Box<dyn FnMut(Error) + Send>;
type CloseCallback = Box<dyn FnOnce() + Send>;

/// Consumer callbacks for one connection.
///
/// All callbacks run on the stream worker thread, not on the thread that
/// called `connect`. Without an error callback, connection and decoding
/// errors are dropped.
pub struct StreamCallbacks {
    on_data: DataCallback,
    on_error: Option<ErrorCallback>,
    on_close: Option<CloseCallback>,
}

impl StreamCallbacks {
    /// Creates callbacks with a data handler invoked once per chunk.
    #[must_use]
    pub fn new<F>(on_data: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        Self {
            on_data: Box::new(on_data),
            on_error: None,
            on_close: None,
        }
    }

    /// Sets the error handler.
    #[must_use]
    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: FnMut(Error) + Send + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Sets the close handler, invoked exactly once when the connection ends.
    #[must_use]
    pub fn on_close<F>(mut self, on_close: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_close = Some(Box::new(on_close));
        self
    }
}

impl fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("on_error", &self.on_error.is_some())
            .field("on_close", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}

/// Event delivered by [`QrngStreamClient::connect_channel`].
#[derive(Debug)]
pub enum StreamEvent {
    /// One chunk of entropy.
    Data(String),
    /// A server-reported or transport error.
    Error(Error),
    /// The connection ended; no further events follow.
    Closed,
}

struct Worker {
    shutdown: oneshot::Sender<()>,
    done: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

/// Streaming client for `/api/stream`.
///
/// ```no_run
/// use qrng_client::{QrngStreamClient, StreamCallbacks, StreamConfig, StreamOptions};
///
/// let mut stream = QrngStreamClient::new(StreamConfig::new("qnrk_..."));
/// stream.connect(
///     StreamCallbacks::new(|chunk| println!("{chunk}")).on_error(|e| eprintln!("{e}")),
///     StreamOptions::default(),
/// )?;
/// // ...
/// stream.disconnect();
/// # Ok::<(), qrng_client::Error>(())
/// ```
pub struct QrngStreamClient {
    api_key: String,
    base_url: String,
    shutdown_timeout: Duration,
    state: Arc<Mutex<SessionState>>,
    worker: Option<Worker>,
}

impl QrngStreamClient {
    /// Creates an idle session.
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        Self {
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            shutdown_timeout: config.shutdown_timeout,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            worker: None,
        }
    }

    /// Creates an idle session for the given key with default settings.
    #[must_use]
    pub fn with_api_key(api_key: &str) -> Self {
        Self::new(StreamConfig::new(api_key))
    }

    /// Returns the base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the stream URL for the given options.
    #[must_use]
    pub fn stream_url(&self, options: &StreamOptions) -> String {
        format!(
            "{}/api/stream?chunkSize={}&format={}",
            self.base_url, options.chunk_size, options.format
        )
    }

    /// Returns the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Returns true while connecting or streaming.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Connecting | SessionState::Streaming
        )
    }

    /// Starts streaming on a background worker and returns immediately.
    ///
    /// The worker authenticates with `{"apiKey": ...}` as its first frame,
    /// then delivers each `data` chunk to `on_data` and each `error` frame,
    /// undecodable frame, data callback panic or transport error to
    /// `on_error`. `on_close` fires once when the connection ends.
    ///
    /// # Errors
    /// * [`Error::AlreadyConnected`] if the session is connecting or streaming.
    /// * [`Error::Api`] if the worker thread cannot be spawned.
    pub fn connect(
        &mut self,
        callbacks: StreamCallbacks,
        options: StreamOptions,
    ) -> Result<(), Error> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }
        if let Some(previous) = self.worker.take() {
            // Already closed on its own; only the thread exit remains.
            let _ = previous.handle.join();
        }

        let session = Session {
            url: self.stream_url(&options),
            api_key: self.api_key.clone(),
            state: Arc::clone(&self.state),
            dispatcher: Dispatcher::new(callbacks),
        };
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (done_tx, done_rx) = mpsc::channel::<()>();

        *self.state.lock() = SessionState::Connecting;
        let handle = thread::Builder::new()
            .name("qrng-stream".to_string())
            .spawn(move || {
                let _done = done_tx;
                session.run(shutdown_rx);
            })
            .map_err(|e| {
                *self.state.lock() = SessionState::Idle;
                Error::api(format!("Failed to spawn stream worker: {e}"))
            })?;

        self.worker = Some(Worker {
            shutdown: shutdown_tx,
            done: done_rx,
            handle,
        });
        Ok(())
    }

    /// Connects and forwards every callback as a [`StreamEvent`] on a channel.
    ///
    /// # Errors
    /// Same as [`QrngStreamClient::connect`].
    pub fn connect_channel(
        &mut self,
        options: StreamOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>, Error> {
        let (tx, rx) = mpsc::channel();
        let data_tx = tx.clone();
        let error_tx = tx.clone();

        let callbacks = StreamCallbacks::new(move |chunk| {
            let _ = data_tx.send(StreamEvent::Data(chunk));
        })
        .on_error(move |err| {
            let _ = error_tx.send(StreamEvent::Error(err));
        })
        .on_close(move || {
            let _ = tx.send(StreamEvent::Closed);
        });

        self.connect(callbacks, options)?;
        Ok(rx)
    }

    /// Closes the connection and waits, up to the shutdown timeout, for the
    /// worker to finish.
    ///
    /// Does nothing if the session was never connected or is already
    /// disconnected. When the worker is still busy at the deadline (for
    /// example inside a slow callback) it is detached rather than killed, and
    /// may still invoke callbacks afterwards.
    pub fn disconnect(&mut self) {
        let Some(Worker {
            shutdown,
            done,
            handle,
        }) = self.worker.take()
        else {
            return;
        };

        let _ = shutdown.send(());
        match done.recv_timeout(self.shutdown_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout = ?self.shutdown_timeout,
                    "stream worker did not stop in time, detaching"
                );
                // The detached worker keeps the old state handle.
                self.state = Arc::new(Mutex::new(SessionState::Closed));
            }
            _ => {
                if handle.join().is_err() {
                    warn!("stream worker panicked");
                }
            }
        }
    }
}

impl fmt::Debug for QrngStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QrngStreamClient")
            .field("base_url", &self.base_url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for QrngStreamClient {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown.send(());
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

struct Session {
    url: String,
    api_key: String,
    state: Arc<Mutex<SessionState>>,
    dispatcher: Dispatcher,
}

impl Session {
    fn run(self, shutdown: oneshot::Receiver<()>) {
        let Session {
            url,
            api_key,
            state,
            mut dispatcher,
        } = self;

        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(receive_loop(
                &url,
                &api_key,
                &state,
                &mut dispatcher,
                shutdown,
            )),
            Err(e) => dispatcher.error(Error::api(format!(
                "Failed to start stream runtime: {e}"
            ))),
        }

        // Closed before on_close so the callback may reconnect.
        *state.lock() = SessionState::Closed;
        dispatcher.close();
        debug!("stream worker finished");
    }
}

async fn receive_loop(
    url: &str,
    api_key: &str,
    state: &Mutex<SessionState>,
    dispatcher: &mut Dispatcher,
    mut shutdown: oneshot::Receiver<()>,
) {
    debug!(%url, "opening entropy stream");
    let ws = tokio::select! {
        result = connect_async(url) => match result {
            Ok((ws, _)) => ws,
            Err(e) => {
                dispatcher.error(Error::api(e.to_string()));
                return;
            }
        },
        _ = &mut shutdown => {
            debug!("stream disconnected before the handshake completed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    let auth = match serde_json::to_string(&AuthMessage { api_key }) {
        Ok(auth) => auth,
        Err(e) => {
            dispatcher.error(Error::api(format!("Failed to encode auth message: {e}")));
            return;
        }
    };
    if let Err(e) = write.send(Message::Text(auth.into())).await {
        dispatcher.error(Error::api(e.to_string()));
        return;
    }
    *state.lock() = SessionState::Streaming;
    debug!("entropy stream authenticated");

    let mut closing = false;
    loop {
        tokio::select! {
            _ = &mut shutdown, if !closing => {
                debug!("closing entropy stream");
                closing = true;
                if let Err(e) = write.close().await {
                    debug!(error = %e, "close handshake failed");
                    break;
                }
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => dispatcher.frame(text.as_bytes()),
                Some(Ok(Message::Binary(bytes))) => dispatcher.frame(&bytes),
                Some(Ok(Message::Close(frame))) => {
                    // Reading on lets tungstenite flush the close reply.
                    debug!(?frame, "stream close frame received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) if closing => {
                    debug!(error = %e, "stream error during close");
                    break;
                }
                Some(Err(e)) => {
                    dispatcher.error(Error::api(e.to_string()));
                    break;
                }
                None => break,
            }
        }
    }
}

/// Routes decoded frames to the consumer callbacks.
struct Dispatcher {
    on_data: DataCallback,
    on_error: Option<ErrorCallback>,
    on_close: Option<CloseCallback>,
}

impl Dispatcher {
    fn new(callbacks: StreamCallbacks) -> Self {
        Self {
            on_data: callbacks.on_data,
            on_error: callbacks.on_error,
            on_close: callbacks.on_close,
        }
    }

    fn frame(&mut self, payload: &[u8]) {
        match serde_json::from_slice::<StreamFrame>(payload) {
            Ok(StreamFrame {
                error: Some(message),
                ..
            }) => self.error(Error::api(message)),
            Ok(StreamFrame {
                data: Some(chunk), ..
            }) => {
                let on_data = &mut self.on_data;
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| on_data(chunk))) {
                    self.error(Error::api(format!(
                        "Stream data callback panicked: {}",
                        panic_message(payload.as_ref())
                    )));
                }
            }
            Ok(_) => debug!("ignoring stream frame without data or error"),
            Err(e) => self.error(Error::api(format!("Invalid stream message: {e}"))),
        }
    }

    fn error(&mut self, err: Error) {
        let Some(on_error) = self.on_error.as_mut() else {
            debug!(error = %err, "stream error dropped, no error callback");
            return;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| on_error(err))) {
            error!(
                panic = %panic_message(payload.as_ref()),
                "stream error callback panicked"
            );
        }
    }

    fn close(mut self) {
        let Some(on_close) = self.on_close.take() else {
            return;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(on_close)) {
            error!(
                panic = %panic_message(payload.as_ref()),
                "stream close callback panicked"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
