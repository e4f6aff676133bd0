//! PostgreSQL storage adapter.
//!
//! Bundle tables are written by the bundles' own storage adapters; this
//! module only owns the pool and the core schema.

mod database;

pub use database::{Database, DatabaseConfig};
