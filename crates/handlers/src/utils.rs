//! Shared payload decoding utilities for message handlers.
//!
//! Log attributes are plain strings; these helpers turn the ones carrying
//! binary payloads, integers or timestamps into typed values. Every helper
//! takes the name of the field it decodes so failures point at the exact
//! attribute. Nothing here substitutes a default on failure.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};

use quill_core::error::DecodeError;

// =============================================================================
// Binary payloads
// =============================================================================

/// Decode a standard (padded) base64 string.
pub fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(value).map_err(|e| DecodeError::Base64 {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Encode bytes as standard (padded) base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a hex string, with or without `0x` prefix.
pub fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, DecodeError> {
    let hex_str = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(hex_str).map_err(|e| DecodeError::Hex {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Decode base64 result data into its textual form.
///
/// Contract result data is stored as text; bytes that are not valid
/// UTF-8 are rejected rather than replaced.
pub fn decode_result_data(field: &str, value: &str) -> Result<String, DecodeError> {
    let bytes = decode_base64(field, value)?;
    String::from_utf8(bytes).map_err(|e| DecodeError::Utf8 {
        field: field.to_string(),
        message: e.to_string(),
    })
}

// =============================================================================
// Numeric parsing
// =============================================================================

/// Parse a code identifier carried as a decimal string.
pub fn parse_code_id(field: &str, value: &str) -> Result<u64, DecodeError> {
    // `u64::from_str` accepts a leading '+', the chain never emits one
    if value.starts_with('+') {
        return Err(DecodeError::Integer {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| DecodeError::Integer {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Time parsing
// =============================================================================

/// Parse an RFC 3339 timestamp (offset required, fractional seconds optional).
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DecodeError::Timestamp {
            field: field.to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
}

// =============================================================================
// Serde helpers for chain JSON
// =============================================================================

/// Deserializers for the JSON encoding used by Cosmos SDK nodes.
pub mod serde_helpers {
    use serde::{Deserialize, Deserializer, de::Error};

    /// A `u64` encoded either as a JSON number or a decimal string.
    pub fn u64_from_str_or_num<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| D::Error::custom(format!("invalid u64: {}", n))),
            serde_json::Value::String(s) => s
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid u64: {:?}", s))),
            other => Err(D::Error::custom(format!("expected u64, got {}", other))),
        }
    }

    /// Bytes encoded as a standard base64 string.
    pub fn bytes_from_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::decode_base64("wasm_byte_code", &s).map_err(D::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================
