//! Unit tests for error module.

use super::*;
use serde_json::json;

// ============================================================================
// Display Tests
// ============================================================================

#[test]
fn test_api_error_display() {
    let error = Error::api("Request failed: connection refused");

    assert_eq!(format!("{}", error), "Request failed: connection refused");
}

#[test]
fn test_authentication_error_display() {
    let error = Error::from_status(ErrorKind::Authentication, "Invalid API key", 401, None);

    assert_eq!(format!("{}", error), "Invalid API key");
}

#[test]
fn test_already_connected_display() {
    let display = format!("{}", Error::AlreadyConnected);

    assert!(display.contains("already connected"));
}

#[test]
fn test_error_debug() {
    let error = Error::from_status(ErrorKind::RateLimit, "Rate limit exceeded", 429, None);

    let debug = format!("{:?}", error);
    assert!(debug.contains("RateLimit"));
    assert!(debug.contains("429"));
}

// ============================================================================
// Classification Tests
// ============================================================================

#[test]
fn test_from_status_maps_each_kind() {
    let cases = [
        (ErrorKind::Api, 500),
        (ErrorKind::Authentication, 401),
        (ErrorKind::RateLimit, 429),
        (ErrorKind::QuotaExceeded, 402),
    ];

    for (kind, status) in cases {
        let error = Error::from_status(kind, "msg", status, None);
        assert_eq!(error.kind(), kind);
        assert_eq!(error.status_code(), Some(status));
    }
}

#[test]
fn test_from_status_already_connected_has_no_details() {
    let error = Error::from_status(ErrorKind::AlreadyConnected, "ignored", 409, None);

    assert!(matches!(error, Error::AlreadyConnected));
    assert!(error.details().is_none());
    assert_eq!(error.status_code(), None);
}

#[test]
fn test_transport_failure_has_no_status() {
    let error = Error::api("Request failed: timed out");

    assert_eq!(error.kind(), ErrorKind::Api);
    assert_eq!(error.status_code(), None);
    assert!(error.response_body().is_none());
}

#[test]
fn test_response_body_is_kept() {
    let body = json!({"error": "bad format", "field": "format"});
    let error = Error::from_status(ErrorKind::Api, "bad format", 400, Some(body.clone()));

    assert_eq!(error.message(), "bad format");
    assert_eq!(error.response_body(), Some(&body));
}
