//! # qrng - command line client for the QRNG API
//!
//! Thin front end over [`qrng_client`]: fetches signed quantum entropy,
//! reports service health and prints a live entropy stream.
//!
//! ## Configuration
//!
//! Settings come from an optional TOML file (`--config`), then from the
//! environment:
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `QRNG_API_KEY` | API key (required) |
//! | `QRNG_BASE_URL` | REST base URL (default `https://qrngapi.com`) |
//! | `QRNG_STREAM_URL` | Stream base URL (default `wss://qrngapi.com`) |
//! | `QRNG_TIMEOUT_SECS` | Request timeout (default 30) |
//!
//! ```toml
//! [api]
//! base_url = "https://qrngapi.com"
//! stream_url = "wss://qrngapi.com"
//! timeout_secs = 30
//! shutdown_timeout_secs = 5
//! ```
//!
//! ## Example Usage
//!
//! ```bash
//! export QRNG_API_KEY=qnrk_...
//!
//! # 32 bytes of hex entropy
//! qrng generate --bytes 32 --format hex
//!
//! # Full signed result with a post-quantum signature
//! qrng generate --bytes 64 --signature-type dilithium3 --json
//!
//! # Service health
//! qrng health
//!
//! # Ten streamed chunks of 16 bytes
//! qrng stream --chunk-size 16 --count 10
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

pub mod config;
