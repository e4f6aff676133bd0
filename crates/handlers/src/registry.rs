//! Bundle registry for managing handler bundles.

use std::cmp::Reverse;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{debug, info, warn};

use quill_core::error::{StorageError, StorageResult};
use quill_core::ports::HandlerRegistry;

use crate::bundle::HandlerBundle;

/// Registry for managing handler bundles.
///
/// The registry handles:
/// - Bundle registration with priority ordering
/// - Migration execution with tracking (idempotent)
/// - Handler extraction for the indexer
///
/// # Example
///
/// ```ignore
/// let mut registry = BundleRegistry::new();
/// registry.register(Box::new(WasmBundle::new(pool.clone(), source)));
///
/// // Run migrations for all bundles (tracked, idempotent)
/// registry.run_migrations(&pool).await?;
///
/// // Convert to HandlerRegistry for the indexer
/// let handlers = registry.into_handler_registry();
/// ```
pub struct BundleRegistry {
    bundles: Vec<Box<dyn HandlerBundle>>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self {
            bundles: Vec::new(),
        }
    }

    /// Register a handler bundle.
    pub fn register(&mut self, bundle: Box<dyn HandlerBundle>) {
        info!(bundle = bundle.name(), "📦 Registering handler bundle");
        self.bundles.push(bundle);
    }

    fn sorted(&self) -> Vec<&dyn HandlerBundle> {
        let mut sorted: Vec<_> = self.bundles.iter().map(|b| &**b).collect();
        sorted.sort_by_key(|b| Reverse(b.priority()));
        sorted
    }

    /// Run all bundle migrations in priority order.
    ///
    /// Applied migrations are recorded in `bundle_migrations` by bundle name,
    /// index and content checksum, and skipped on later runs.
    pub async fn run_migrations(&self, pool: &sqlx::PgPool) -> StorageResult<()> {
        for bundle in self.sorted() {
            let migrations = bundle.migrations();
            if migrations.is_empty() {
                debug!(bundle = bundle.name(), "No migrations to run");
                continue;
            }

            for (index, migration) in migrations.iter().enumerate() {
                let checksum = compute_checksum(migration);

                let existing: Option<(String,)> = sqlx::query_as(
                    "SELECT checksum FROM bundle_migrations WHERE bundle_name = $1 AND migration_index = $2",
                )
                .bind(bundle.name())
                .bind(index as i32)
                .fetch_optional(pool)
                .await
                .map_err(|e| StorageError::MigrationError(e.to_string()))?;

                if let Some((existing_checksum,)) = existing {
                    if existing_checksum != checksum {
                        warn!(
                            bundle = bundle.name(),
                            migration = index,
                            expected = %checksum,
                            found = %existing_checksum,
                            "⚠️  Migration checksum mismatch! Migration content has changed."
                        );
                    }
                    debug!(bundle = bundle.name(), migration = index, "Migration already applied, skipping");
                    continue;
                }

                info!(bundle = bundle.name(), migration = index, "🗄️  Applying migration");

                let mut tx = pool
                    .begin()
                    .await
                    .map_err(|e| StorageError::TransactionError(e.to_string()))?;

                sqlx::raw_sql(migration)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        StorageError::MigrationError(format!("{} #{}: {}", bundle.name(), index, e))
                    })?;

                sqlx::query(
                    "INSERT INTO bundle_migrations (bundle_name, migration_index, checksum) VALUES ($1, $2, $3)",
                )
                .bind(bundle.name())
                .bind(index as i32)
                .bind(&checksum)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::MigrationError(e.to_string()))?;

                tx.commit()
                    .await
                    .map_err(|e| StorageError::TransactionError(e.to_string()))?;
            }

            bundle.on_initialized();
        }

        Ok(())
    }

    /// Convert this registry into a HandlerRegistry, consuming it.
    pub fn into_handler_registry(self) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();

        for bundle in self.sorted() {
            let handlers = bundle.handlers();
            debug!(
                bundle = bundle.name(),
                handlers = handlers.len(),
                "Extracting handlers"
            );

            for handler in handlers {
                registry.register(handler);
            }
        }

        registry
    }

    pub fn bundle_names(&self) -> Vec<&'static str> {
        self.bundles.iter().map(|b| b.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Deduplicated tables declared by all bundles, in declaration order.
    pub fn tables_to_purge(&self) -> Vec<&'static str> {
        let mut tables: Vec<&'static str> = Vec::new();
        for table in self.bundles.iter().flat_map(|b| b.tables_to_purge().iter().copied()) {
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        tables
    }

    /// Truncate all bundle-owned tables in a single statement.
    ///
    /// Returns the number of tables truncated.
    pub async fn purge_tables(&self, pool: &sqlx::PgPool) -> StorageResult<usize> {
        let tables = self.tables_to_purge();
        if tables.is_empty() {
            return Ok(0);
        }

        debug!(tables = %tables.join(", "), "Truncating bundle tables");
        // Table names can't be bound as parameters
        let query = format!("TRUNCATE {} RESTART IDENTITY CASCADE", tables.join(", "));
        sqlx::raw_sql(&query)
            .execute(pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(tables.len())
    }
}

impl Default for BundleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute a checksum for migration content.
fn compute_checksum(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
