//! Blocking HTTP client for the QRNG REST API.

use crate::error::{Error, ErrorDetails, ErrorKind};
use crate::types::{EntropyResult, GenerateRequest, HealthStatus};
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
mod tests;

/// Default REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://qrngapi.com";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the API key on every REST call.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// API key sent as `X-API-Key`.
    pub api_key: String,
    /// Base URL of the API (e.g., "https://qrngapi.com").
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration with the default endpoint and timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Blocking client for `/api/random` and `/api/health`.
///
/// Each call is a single attempt; retry policy is left to the caller. The
/// underlying connection pool is shared by all calls on one instance and
/// released when the client is closed or dropped.
#[derive(Debug, Clone)]
pub struct QrngClient {
    client: Client,
    base_url: String,
}

impl QrngClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| Error::api(format!("Invalid API key header: {e}")))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::api(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client for the given key with default settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_api_key(api_key: &str) -> Result<Self, Error> {
        Self::new(ClientConfig::new(api_key))
    }

    /// Returns the base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Random
    // ========================================================================

    /// Requests signed entropy.
    ///
    /// Unset `method`/`signature_type` are left out of the query so the server
    /// applies its defaults.
    ///
    /// # Errors
    /// * [`Error::Authentication`] on HTTP 401.
    /// * [`Error::RateLimit`] on HTTP 429.
    /// * [`Error::QuotaExceeded`] on HTTP 402.
    /// * [`Error::Api`] on any other failure, including transport faults and
    ///   undecodable responses.
    pub fn generate(&self, request: &GenerateRequest) -> Result<EntropyResult, Error> {
        let query = serde_urlencoded::to_string(request)
            .map_err(|e| Error::api(format!("Invalid request parameters: {e}")))?;
        let url = format!("{}/api/random?{}", self.base_url, query);
        debug!(bytes = request.bytes, format = %request.format, "requesting entropy");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::api(format!("Request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Self::failure(resp));
        }

        let body = resp
            .text()
            .map_err(|e| Error::api(format!("Request failed: {e}")))?;
        let result: EntropyResult = serde_json::from_str(&body)
            .map_err(|e| Error::api(format!("Invalid response: {e}")))?;
        if let Some(field) = result.first_empty_field() {
            return Err(Error::api(format!("Invalid response: empty `{field}`")));
        }

        debug!(proof_id = %result.proof_id, "entropy received");
        Ok(result)
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Fetches service health.
    ///
    /// # Errors
    /// Returns [`Error::Api`] for any non-success status, transport fault or
    /// decoding failure.
    pub fn health(&self) -> Result<HealthStatus, Error> {
        let url = format!("{}/api/health", self.base_url);
        self.client
            .get(&url)
            .send()
            .and_then(Response::error_for_status)
            .and_then(Response::json::<HealthStatus>)
            .map_err(|e| {
                let details = ErrorDetails::new(format!("Health check failed: {e}"));
                Error::Api(match e.status() {
                    Some(status) => details.with_status(status.as_u16()),
                    None => details,
                })
            })
    }

    /// Releases the connection pool.
    pub fn close(self) {
        debug!(base_url = %self.base_url, "closing QRNG client");
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn failure(resp: Response) -> Error {
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().map(|b| b.to_vec()).unwrap_or_default();
        classify_failure(status, content_type.as_deref(), &body)
    }
}

/// Maps a non-success response to the error taxonomy.
///
/// 401, 429 and 402 are checked in that order before the generic case.
pub(crate) fn classify_failure(status: u16, content_type: Option<&str>, body: &[u8]) -> Error {
    let body = content_type
        .filter(|ct| is_json_content_type(ct))
        .and_then(|_| serde_json::from_slice::<Value>(body).ok());

    match status {
        401 => Error::from_status(ErrorKind::Authentication, "Invalid API key", status, body),
        429 => Error::from_status(ErrorKind::RateLimit, "Rate limit exceeded", status, body),
        402 => Error::from_status(ErrorKind::QuotaExceeded, "Monthly quota exceeded", status, body),
        _ => {
            let message = body
                .as_ref()
                .and_then(|b| b.get("error"))
                .and_then(Value::as_str)
                .map_or_else(|| format!("HTTP {status}"), str::to_string);
            Error::from_status(ErrorKind::Api, message, status, body)
        }
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
