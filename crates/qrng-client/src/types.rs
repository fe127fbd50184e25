//! Request and response types for the QRNG API.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;


/// Error returned when parsing an unknown enum value from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseVariantError {
    kind: &'static str,
    value: String,
    expected: String,
}

/// Implements `Display`/`FromStr` over the lowercase wire names of a unit enum.
macro_rules! wire_enum {
    ($ty:ident, $kind:literal, $($variant:ident => $name:literal),+ $(,)?) => {
        impl $ty {
            /// Returns the wire name.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseVariantError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(ParseVariantError {
                        kind: $kind,
                        value: other.to_string(),
                        expected: [$($name),+].join(", "),
                    }),
                }
            }
        }
    };
}

/// Output encoding of the returned entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Hexadecimal string.
    #[default]
    Hex,
    /// Base64 string.
    Base64,
    /// String of `0`/`1` digits.
    Binary,
    /// Comma-separated bytes.
    Uint8,
    /// Comma-separated 32-bit words.
    Uint32,
}

wire_enum!(OutputFormat, "format",
    Hex => "hex",
    Base64 => "base64",
    Binary => "binary",
    Uint8 => "uint8",
    Uint32 => "uint32",
);

/// Physical entropy source requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantumMethod {
    /// Let the service choose.
    Auto,
    /// Photon arrival / beam splitter.
    Photon,
    /// Quantum tunneling noise.
    Tunneling,
    /// Vacuum fluctuations.
    Vacuum,
    /// Software simulator.
    Simulator,
}

wire_enum!(QuantumMethod, "method",
    Auto => "auto",
    Photon => "photon",
    Tunneling => "tunneling",
    Vacuum => "vacuum",
    Simulator => "simulator",
);

/// Signature scheme used for the generation proof.
///
/// Dilithium variants require a higher account tier; the server rejects them
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureType {
    /// Ed25519.
    Ed25519,
    /// ML-DSA level 2.
    Dilithium2,
    /// ML-DSA level 3.
    Dilithium3,
    /// ML-DSA level 5.
    Dilithium5,
}

wire_enum!(SignatureType, "signature type",
    Ed25519 => "ed25519",
    Dilithium2 => "dilithium2",
    Dilithium3 => "dilithium3",
    Dilithium5 => "dilithium5",
);

// ============================================================================
// Random
// ============================================================================

/// Parameters of one entropy request.
///
/// Values are not range-checked locally; the server is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Number of random bytes (1-1024 on the server side).
    pub bytes: u32,
    /// Output format.
    pub format: OutputFormat,
    /// Entropy source; omitted means server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<QuantumMethod>,
    /// Signature scheme; omitted means server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<SignatureType>,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            bytes: 32,
            format: OutputFormat::Hex,
            method: None,
            signature_type: None,
        }
    }
}

impl GenerateRequest {
    /// Creates a request for `bytes` bytes in hex.
    #[must_use]
    pub fn new(bytes: u32) -> Self {
        Self {
            bytes,
            ..Default::default()
        }
    }

    /// Sets the output format.
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the entropy source.
    #[must_use]
    pub fn method(mut self, method: QuantumMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the signature scheme.
    #[must_use]
    pub fn signature_type(mut self, signature_type: SignatureType) -> Self {
        self.signature_type = Some(signature_type);
        self
    }
}

/// Signed entropy returned by `/api/random`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntropyResult {
    /// Random data encoded in the requested format.
    pub data: String,
    /// Identifier of the server-side generation proof.
    pub proof_id: String,
    /// Signature over `data`.
    pub signature: String,
    /// Verification key for `signature`.
    pub public_key: String,
    /// Signature scheme tag, as sent by the server.
    pub signature_type: String,
    /// Auxiliary fields.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl EntropyResult {
    /// Parses the signature tag into a known scheme.
    #[must_use]
    pub fn signature_scheme(&self) -> Option<SignatureType> {
        self.signature_type.parse().ok()
    }

    /// Returns the name of the first required field that is empty.
    pub(crate) fn first_empty_field(&self) -> Option<&'static str> {
        [
            ("data", &self.data),
            ("proofId", &self.proof_id),
            ("signature", &self.signature),
            ("publicKey", &self.public_key),
            ("signatureType", &self.signature_type),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
    }
}

// ============================================================================
// Health
// ============================================================================

/// Service health returned by `/api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Service state (e.g. "healthy").
    pub status: String,
    /// Health indicators such as NIST test results.
    pub metrics: HashMap<String, Value>,
    /// ISO-8601 timestamp of the report.
    pub timestamp: String,
}

impl HealthStatus {
    /// Parses `timestamp` as RFC 3339.
    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok()
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// Parameters of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Bytes per chunk (1-1024 on the server side).
    pub chunk_size: u32,
    /// Output format of each chunk.
    pub format: OutputFormat,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: 32,
            format: OutputFormat::Hex,
        }
    }
}

/// First frame sent after the stream opens.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthMessage<'a> {
    pub api_key: &'a str,
}

/// Inbound stream frame: either a data chunk or an error.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamFrame {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}
