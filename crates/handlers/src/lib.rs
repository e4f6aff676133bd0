//! Handler bundles for the quill indexer.
//!
//! Each bundle is self-contained with its own:
//!
//! - Message handlers (log extraction and record building)
//! - SQL migrations (table definitions)
//! - Models (domain records)
//!
//! # Registering Bundles
//!
//! ```ignore
//! let mut registry = BundleRegistry::new();
//! registry.register(Box::new(WasmBundle::new(pool.clone(), source)));
//!
//! // Run all bundle migrations
//! registry.run_migrations(&pool).await?;
//!
//! // Get unified handler registry
//! let handlers = registry.into_handler_registry();
//! ```

pub mod utils;
pub mod wasm;

mod bundle;
mod registry;

pub use bundle::HandlerBundle;
pub use registry::BundleRegistry;

pub use wasm::WasmBundle;
