//! Cosmos SDK adapter for quill.
//!
//! Implements the [`quill_core::ports::TxSource`] and
//! [`quill_handlers::wasm::WasmSource`] ports over a node's LCD (REST gateway).

mod client;
mod types;

pub use client::{CosmosClient, CosmosClientConfig};
