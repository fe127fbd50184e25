//! Unit tests for client module.

use super::*;
use serde_json::json;

// ============================================================================
// ClientConfig Tests
// ============================================================================

#[test]
fn test_client_config_default() {
    let config = ClientConfig::new("qnrk_test");

    assert_eq!(config.api_key, "qnrk_test");
    assert_eq!(config.base_url, "https://qrngapi.com");
    assert_eq!(config.timeout, Duration::from_secs(30));
}

#[test]
fn test_client_config_custom() {
    let config = ClientConfig::new("qnrk_test")
        .with_base_url("http://localhost:9000")
        .with_timeout(Duration::from_secs(5));

    assert_eq!(config.base_url, "http://localhost:9000");
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn test_client_config_debug_redacts_key() {
    let config = ClientConfig::new("qnrk_secret_value");

    let debug = format!("{:?}", config);
    assert!(!debug.contains("qnrk_secret_value"));
    assert!(debug.contains("redacted"));
}

// ============================================================================
// QrngClient Creation Tests
// ============================================================================

#[test]
fn test_qrng_client_new() {
    let client = QrngClient::new(ClientConfig::new("qnrk_test"));

    assert!(client.is_ok());
}

#[test]
fn test_qrng_client_with_api_key() {
    let client = QrngClient::with_api_key("qnrk_test").unwrap();

    assert_eq!(client.base_url(), "https://qrngapi.com");
}

#[test]
fn test_qrng_client_base_url_trimmed() {
    let config = ClientConfig::new("k").with_base_url("http://localhost:8080/");
    let client = QrngClient::new(config).unwrap();

    assert_eq!(client.base_url(), "http://localhost:8080");
}

#[test]
fn test_qrng_client_rejects_unencodable_key() {
    let err = QrngClient::new(ClientConfig::new("bad\nkey")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(err.message().contains("Invalid API key header"));
}

#[test]
fn test_qrng_client_close() {
    let client = QrngClient::with_api_key("qnrk_test").unwrap();

    client.close();
}

// ============================================================================
// Failure Classification Tests
// ============================================================================

#[test]
fn test_classify_401_is_authentication() {
    let err = classify_failure(401, Some("application/json"), br#"{"error":"nope"}"#);

    assert!(matches!(err, Error::Authentication(_)));
    assert_eq!(err.message(), "Invalid API key");
    assert_eq!(err.status_code(), Some(401));
}

#[test]
fn test_classify_429_is_rate_limit() {
    let err = classify_failure(429, None, b"");

    assert!(matches!(err, Error::RateLimit(_)));
    assert_eq!(err.message(), "Rate limit exceeded");
}

#[test]
fn test_classify_402_is_quota_exceeded() {
    let err = classify_failure(402, Some("text/plain"), b"pay up");

    assert!(matches!(err, Error::QuotaExceeded(_)));
    assert_eq!(err.message(), "Monthly quota exceeded");
}

#[test]
fn test_classify_other_uses_json_error_field() {
    let err = classify_failure(
        400,
        Some("application/json; charset=utf-8"),
        br#"{"error":"bytes must be between 1 and 1024","max":1024}"#,
    );

    assert!(matches!(err, Error::Api(_)));
    assert_eq!(err.message(), "bytes must be between 1 and 1024");
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.response_body().unwrap()["max"], json!(1024));
}

#[test]
fn test_classify_other_without_json_falls_back_to_status() {
    let err = classify_failure(503, Some("text/html"), b"<h1>down</h1>");

    assert_eq!(err.message(), "HTTP 503");
    assert!(err.response_body().is_none());
}

#[test]
fn test_classify_other_with_invalid_json_falls_back_to_status() {
    let err = classify_failure(500, Some("application/json"), b"not json");

    assert_eq!(err.message(), "HTTP 500");
}

#[test]
fn test_classify_other_json_without_error_field() {
    let err = classify_failure(403, Some("application/json"), br#"{"detail":"tier"}"#);

    assert_eq!(err.message(), "HTTP 403");
    assert_eq!(err.response_body(), Some(&json!({"detail": "tier"})));
}

#[test]
fn test_classify_is_mutually_exclusive() {
    for status in [400u16, 401, 402, 403, 404, 429, 500, 502] {
        let kind = classify_failure(status, None, b"").kind();
        let expected = match status {
            401 => ErrorKind::Authentication,
            429 => ErrorKind::RateLimit,
            402 => ErrorKind::QuotaExceeded,
            _ => ErrorKind::Api,
        };
        assert_eq!(kind, expected, "status {status}");
    }
}

#[test]
fn test_is_json_content_type() {
    assert!(is_json_content_type("application/json"));
    assert!(is_json_content_type("Application/JSON; charset=utf-8"));
    assert!(!is_json_content_type("text/plain"));
    assert!(!is_json_content_type("application/jsonp"));
}
