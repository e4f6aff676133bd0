//! Port trait for module-specific message handlers.
//!
//! This is the main extensibility point for the indexer. Each chain module
//! that needs custom indexing logic implements this trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DomainResult;
use crate::models::{RawMessage, Tx};

/// Trait for module-specific message handlers.
///
/// Implement this trait to add custom indexing logic for a chain module.
/// The handler is called once per message of every indexed transaction,
/// in message order.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Module name this handler processes (e.g., "wasm").
    fn name(&self) -> &'static str;

    /// Process the message at `index` of `tx`.
    ///
    /// Messages that do not belong to this handler's module must be
    /// ignored and return `Ok(())`.
    async fn handle_msg(&self, index: usize, msg: &RawMessage, tx: &Tx) -> DomainResult<()>;

    /// Called before the transactions of a block are processed (optional).
    ///
    /// Useful for periodic snapshots of module state.
    async fn on_block(&self, _height: u64) -> DomainResult<()> {
        Ok(())
    }

    /// Priority for handler execution (higher = earlier).
    /// Default is 0.
    fn priority(&self) -> i32 {
        0
    }
}

/// Registry for message handlers.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
    ordered_handlers: Vec<Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            ordered_handlers: Vec::new(),
        }
    }

    /// Register a handler for a module.
    pub fn register(&mut self, handler: Arc<dyn MessageHandler>) {
        let name = handler.name().to_string();
        self.handlers.insert(name, handler.clone());
        self.ordered_handlers.push(handler);
        // Sort by priority (descending)
        self.ordered_handlers
            .sort_by_key(|b| std::cmp::Reverse(b.priority()));
    }

    /// Get handler for a specific module.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn MessageHandler>> {
        self.handlers.get(name)
    }

    /// Get all handlers in priority order.
    pub fn all(&self) -> &[Arc<dyn MessageHandler>] {
        &self.ordered_handlers
    }

    /// Check if a module has a registered handler.
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// List all registered module names.
    pub fn registered_modules(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.ordered_handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockHandler(&'static str, i32);

    #[async_trait]
    impl MessageHandler for MockHandler {
        fn name(&self) -> &'static str { self.0 }
        fn priority(&self) -> i32 { self.1 }
        async fn handle_msg(&self, _: usize, _: &RawMessage, _: &Tx) -> DomainResult<()> {
            Ok(())
        }
    }

    // Test critique: les handlers sont triés par priorité (décroissante)
    #[test]
    fn test_handler_registry_priority_order() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(MockHandler("low", -10)));
        registry.register(Arc::new(MockHandler("high", 100)));
        registry.register(Arc::new(MockHandler("medium", 50)));

        let all = registry.all();
        // Ordre décroissant par priorité
        assert_eq!(all[0].name(), "high");
        assert_eq!(all[1].name(), "medium");
        assert_eq!(all[2].name(), "low");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_handler_registry_lookup() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(MockHandler("wasm", 0)));

        assert!(registry.has_handler("wasm"));
        assert!(!registry.has_handler("bank"));
        assert_eq!(registry.get("wasm").map(|h| h.name()), Some("wasm"));
        assert_eq!(registry.registered_modules(), vec!["wasm"]);
    }
}
