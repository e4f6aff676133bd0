//! Handler bundle trait definition.

use std::sync::Arc;

use quill_core::ports::MessageHandler;

/// A self-contained bundle of handlers for one chain module.
///
/// A bundle owns its database schema (via migrations) and the message
/// handlers that write to it.
///
/// # Example
///
/// ```ignore
/// pub struct MyBundle { /* ... */ }
///
/// impl HandlerBundle for MyBundle {
///     fn name(&self) -> &'static str { "my_module" }
///
///     fn handlers(&self) -> Vec<Arc<dyn MessageHandler>> {
///         vec![Arc::new(MyHandler::new())]
///     }
///
///     fn migrations(&self) -> &'static [&'static str] {
///         &[include_str!("migrations/001_init.sql")]
///     }
/// }
/// ```
pub trait HandlerBundle: Send + Sync {
    /// Unique name identifying this bundle.
    ///
    /// Used for logging and migration tracking.
    fn name(&self) -> &'static str;

    /// Message handlers provided by this bundle.
    fn handlers(&self) -> Vec<Arc<dyn MessageHandler>>;

    /// SQL migration statements for this bundle's schema, applied in order.
    ///
    /// Never edit a migration once released; append a new one instead.
    fn migrations(&self) -> &'static [&'static str] {
        &[]
    }

    /// Priority for bundle initialization (higher = earlier).
    fn priority(&self) -> i32 {
        0
    }

    /// Called after all migrations have been run.
    fn on_initialized(&self) {}

    /// Tables owned by this bundle, truncated by `--purge`.
    fn tables_to_purge(&self) -> &'static [&'static str] {
        &[]
    }
}
