//! Storage layer for the quill indexer.
//!
//! Provides the PostgreSQL connection pool and the core migrations.
//!
//! # Usage
//!
//! ```ignore
//! use quill_storage::{Database, DatabaseConfig};
//!
//! let config = DatabaseConfig::for_indexer(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig};
