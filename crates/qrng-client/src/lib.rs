//! Client library for the QRNG API.
//!
//! This crate retrieves cryptographically signed quantum entropy, either one
//! request at a time over REST ([`QrngClient`]) or as a continuous push stream
//! over WebSocket ([`QrngStreamClient`]). Verifying the returned signatures is
//! left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use qrng_client::{ClientConfig, GenerateRequest, OutputFormat, QrngClient};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), qrng_client::Error> {
//!     let client = QrngClient::new(
//!         ClientConfig::new("qnrk_...").with_timeout(Duration::from_secs(10)),
//!     )?;
//!
//!     let result = client.generate(&GenerateRequest::new(32).format(OutputFormat::Hex))?;
//!     println!("{} (proof {})", result.data, result.proof_id);
//!
//!     let health = client.health()?;
//!     println!("Status: {}", health.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Every failure is one of the [`Error`] variants; raw transport errors never
//! escape. Stream errors are delivered to the error callback on the worker
//! thread instead of being returned.

mod client;
mod error;
mod streaming;
mod types;

pub use client::{API_KEY_HEADER, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, QrngClient};
pub use error::{Error, ErrorDetails, ErrorKind};
pub use streaming::{
    DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_STREAM_URL, QrngStreamClient, SessionState, StreamCallbacks,
    StreamConfig, StreamEvent,
};
pub use types::{
    EntropyResult, GenerateRequest, HealthStatus, OutputFormat, ParseVariantError, QuantumMethod,
    SignatureType, StreamOptions,
};
