//! Core domain layer for the quill indexer.
//!
//! This crate contains the transaction models, port traits (interfaces), and
//! the block-processing service for the CosmWasm indexer. It follows
//! hexagonal architecture principles - this is the innermost layer with
//! no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       quill (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │     quill-handlers       │          quill-cosmos            │
//! │   (bundles, wasm)        │          (LCD client)            │
//! ├──────────────────────────┴──────────────────────────────────┤
//! │                      quill-storage                          │
//! │                       (PostgreSQL)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     quill-core  ← YOU ARE HERE              │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Transactions, logs, events and attribute lookup
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Core business logic (IndexerService)
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! - [`ports::TxSource`] - Fetch the transactions of a block
//! - [`ports::MessageHandler`] - Turn module messages into records
//!
//! ## Handler System
//!
//! Each chain module that needs indexing implements
//! [`ports::MessageHandler`]. Handlers are registered in a
//! [`ports::HandlerRegistry`] and called for every message of every
//! transaction, strictly in message order.
//!
//! ## Indexer Lifecycle
//!
//! 1. Wait for the next committed height
//! 2. Fetch its transactions
//! 3. Run block hooks, then dispatch each message to the handlers
//! 4. Stop at the first failure; otherwise continue with the next height

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
