//! Error types for the indexer domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`LookupError`] - Event or attribute missing from a transaction log
//! - [`DecodeError`] - Malformed payload (base64, hex, integer, timestamp)
//! - [`SourceError`] - Remote chain queries (contract info, transactions)
//! - [`StorageError`] - Database/repository errors
//! - [`DomainError`] - Everything a handler can fail with
//! - [`IndexerError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Lookup Errors
// =============================================================================

/// A required event or attribute is absent from the transaction log.
///
/// Either the log schema does not match what the handler expects or the
/// data is genuinely missing. Both halt processing of the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No event of the requested type in the log of the message.
    #[error("no {event_type} event found for message {msg_index} inside tx {tx_hash}")]
    EventNotFound {
        event_type: String,
        msg_index: usize,
        tx_hash: String,
    },

    /// The event exists but does not carry the requested attribute.
    #[error("no attribute {key} found in {event_type} event inside tx {tx_hash}")]
    AttributeNotFound {
        key: String,
        event_type: String,
        tx_hash: String,
    },
}

// =============================================================================
// Decode Errors
// =============================================================================

/// A value was found but could not be decoded.
///
/// Every variant names the field or attribute that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid base64 in {field}: {message}")]
    Base64 { field: String, message: String },

    #[error("invalid hex in {field}: {message}")]
    Hex { field: String, message: String },

    #[error("invalid integer in {field}: {value:?}")]
    Integer { field: String, value: String },

    #[error("invalid RFC 3339 timestamp in {field}: {value:?} ({message})")]
    Timestamp {
        field: String,
        value: String,
        message: String,
    },

    #[error("invalid UTF-8 in {field}: {message}")]
    Utf8 { field: String, message: String },

    /// A recognized message type whose body does not match its schema.
    #[error("malformed {type_url} message: {message}")]
    Message { type_url: String, message: String },
}

impl DecodeError {
    /// Name of the field that failed to decode.
    pub fn field(&self) -> &str {
        match self {
            Self::Base64 { field, .. }
            | Self::Hex { field, .. }
            | Self::Integer { field, .. }
            | Self::Timestamp { field, .. }
            | Self::Utf8 { field, .. } => field,
            Self::Message { type_url, .. } => type_url,
        }
    }
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors raised while querying chain state or transactions remotely.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request reached the node but failed.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Requested item does not exist at the queried height.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Domain Errors
// =============================================================================

/// Failure while extracting and persisting records for one message.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DomainError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lookup(_) => "lookup",
            Self::Decode(_) => "decode",
            Self::Source(_) => "source",
            Self::Storage(_) => "storage",
        }
    }
}

// =============================================================================
// Indexer Errors
// =============================================================================

/// Top-level indexer orchestration errors.
///
/// This is the main error type returned by [`crate::services::IndexerService`].
/// It wraps all lower-level errors and adds indexer-specific variants.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Domain logic error outside of message handling (e.g. block hooks).
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Storage/database error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote source error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A message failed; the block at `height` must not be considered indexed.
    #[error("Message {msg_index} of tx {tx_hash} at height {height} failed in {handler}: {source}")]
    Message {
        height: u64,
        tx_hash: String,
        msg_index: usize,
        handler: &'static str,
        #[source]
        source: DomainError,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Graceful shutdown was requested.
    ///
    /// This is not really an error but uses the error type for control flow.
    #[error("Indexer shutdown requested")]
    ShutdownRequested,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for remote source operations.
pub type SourceResult<T> = Result<T, SourceError>;
