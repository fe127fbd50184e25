//! Unit tests for streaming module.

use super::*;
use crate::types::OutputFormat;
use std::time::Instant;

/// Callbacks that record every invocation into a shared log.
fn recording_callbacks() -> (StreamCallbacks, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let data_log = Arc::clone(&log);
    let error_log = Arc::clone(&log);
    let close_log = Arc::clone(&log);

    let callbacks = StreamCallbacks::new(move |chunk| data_log.lock().push(format!("data:{chunk}")))
        .on_error(move |err| error_log.lock().push(format!("error:{}", err.message())))
        .on_close(move || close_log.lock().push("close".to_string()));

    (callbacks, log)
}

// ============================================================================
// StreamConfig Tests
// ============================================================================

#[test]
fn test_stream_config_default() {
    let config = StreamConfig::new("qnrk_test");

    assert_eq!(config.base_url, "wss://qrngapi.com");
    assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
}

#[test]
fn test_stream_config_debug_redacts_key() {
    let config = StreamConfig::new("qnrk_secret_value");

    let debug = format!("{:?}", config);
    assert!(!debug.contains("qnrk_secret_value"));
}

// ============================================================================
// QrngStreamClient Tests
// ============================================================================

#[test]
fn test_stream_client_starts_idle() {
    let client = QrngStreamClient::with_api_key("qnrk_test");

    assert_eq!(client.state(), SessionState::Idle);
    assert!(!client.is_connected());
}

#[test]
fn test_stream_url() {
    let client = QrngStreamClient::new(
        StreamConfig::new("qnrk_test").with_base_url("ws://localhost:9000/"),
    );
    let options = StreamOptions {
        chunk_size: 64,
        format: OutputFormat::Base64,
    };

    assert_eq!(client.base_url(), "ws://localhost:9000");
    assert_eq!(
        client.stream_url(&options),
        "ws://localhost:9000/api/stream?chunkSize=64&format=base64"
    );
}

#[test]
fn test_stream_url_does_not_validate_chunk_size() {
    let client = QrngStreamClient::with_api_key("qnrk_test");
    let options = StreamOptions {
        chunk_size: 0,
        format: OutputFormat::Hex,
    };

    assert_eq!(
        client.stream_url(&options),
        "wss://qrngapi.com/api/stream?chunkSize=0&format=hex"
    );
}

#[test]
fn test_disconnect_before_connect_is_prompt_noop() {
    let mut client = QrngStreamClient::with_api_key("qnrk_test");

    let started = Instant::now();
    client.disconnect();
    client.disconnect();

    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(client.state(), SessionState::Idle);
}

#[test]
fn test_stream_client_debug_hides_key() {
    let client = QrngStreamClient::with_api_key("qnrk_secret_value");

    let debug = format!("{:?}", client);
    assert!(!debug.contains("qnrk_secret_value"));
    assert!(debug.contains("Idle"));
}

// ============================================================================
// Dispatcher Tests
// ============================================================================

#[test]
fn test_dispatcher_data_frames_in_order() {
    let (callbacks, log) = recording_callbacks();
    let mut dispatcher = Dispatcher::new(callbacks);

    dispatcher.frame(br#"{"data":"aa"}"#);
    dispatcher.frame(br#"{"data":"bb"}"#);
    dispatcher.frame(br#"{"data":"cc"}"#);

    assert_eq!(*log.lock(), vec!["data:aa", "data:bb", "data:cc"]);
}

#[test]
fn test_dispatcher_error_frame_skips_data() {
    let (callbacks, log) = recording_callbacks();
    let mut dispatcher = Dispatcher::new(callbacks);

    dispatcher.frame(br#"{"error":"x","data":"ignored"}"#);

    assert_eq!(*log.lock(), vec!["error:x"]);
}

#[test]
fn test_dispatcher_malformed_frame_keeps_going() {
    let (callbacks, log) = recording_callbacks();
    let mut dispatcher = Dispatcher::new(callbacks);

    dispatcher.frame(b"not json at all");
    dispatcher.frame(br#"{"data":"ok"}"#);

    let log = log.lock();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with("error:Invalid stream message"));
    assert_eq!(log[1], "data:ok");
}

#[test]
fn test_dispatcher_ignores_frames_without_payload() {
    let (callbacks, log) = recording_callbacks();
    let mut dispatcher = Dispatcher::new(callbacks);

    dispatcher.frame(br#"{"type":"heartbeat"}"#);

    assert!(log.lock().is_empty());
}

#[test]
fn test_dispatcher_data_callback_panic_becomes_error() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let error_log = Arc::clone(&log);
    let data_log = Arc::clone(&log);
    let callbacks = StreamCallbacks::new(move |chunk| {
        if chunk == "boom" {
            panic!("consumer failed");
        }
        data_log.lock().push(format!("data:{chunk}"));
    })
    .on_error(move |err| error_log.lock().push(format!("error:{}", err.message())));
    let mut dispatcher = Dispatcher::new(callbacks);

    dispatcher.frame(br#"{"data":"boom"}"#);
    dispatcher.frame(br#"{"data":"after"}"#);

    let log = log.lock();
    assert_eq!(log[0], "error:Stream data callback panicked: consumer failed");
    assert_eq!(log[1], "data:after");
}

#[test]
fn test_dispatcher_without_error_callback_drops_errors() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let mut dispatcher = Dispatcher::new(StreamCallbacks::new(move |chunk| sink.lock().push(chunk)));

    dispatcher.frame(br#"{"error":"quota"}"#);
    dispatcher.frame(b"{broken");
    dispatcher.frame(br#"{"data":"still here"}"#);

    assert_eq!(*received.lock(), vec!["still here".to_string()]);
}

#[test]
fn test_dispatcher_close_fires_once_last() {
    let (callbacks, log) = recording_callbacks();
    let mut dispatcher = Dispatcher::new(callbacks);

    dispatcher.frame(br#"{"data":"aa"}"#);
    dispatcher.error(Error::api("connection reset"));
    dispatcher.close();

    assert_eq!(
        *log.lock(),
        vec!["data:aa", "error:connection reset", "close"]
    );
}

#[test]
fn test_dispatcher_close_panic_is_contained() {
    let callbacks = StreamCallbacks::new(|_| {}).on_close(|| panic!("close handler failed"));
    let dispatcher = Dispatcher::new(callbacks);

    dispatcher.close();
}

#[test]
fn test_panic_message_variants() {
    let static_str: Box<dyn Any + Send> = Box::new("static");
    let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
    let other: Box<dyn Any + Send> = Box::new(42u8);

    assert_eq!(panic_message(static_str.as_ref()), "static");
    assert_eq!(panic_message(owned.as_ref()), "owned");
    assert_eq!(panic_message(other.as_ref()), "unknown panic");
}
