//! Core indexer service - orchestrates block processing.
//!
//! Blocks are processed one at a time, transactions in block order and
//! messages in transaction order. The first failure stops the run so a
//! block is never left partially applied without the operator noticing.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, trace, warn};

use crate::error::{IndexerError, IndexerResult};
use crate::metrics::{ProcessingTimer, record_block_indexed, record_handler_error};
use crate::models::Tx;
use crate::ports::{HandlerRegistry, TxSource};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the indexer service.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// First height to index.
    pub start_height: u64,
    /// Last height to index (inclusive). `None` follows the chain head.
    pub end_height: Option<u64>,
    /// Polling interval while waiting for new blocks.
    pub poll_interval: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            start_height: 1,
            end_height: None,
            poll_interval: Duration::from_secs(6),
        }
    }
}

// =============================================================================
// IndexerService
// =============================================================================

/// Main indexer service.
///
/// # Flow
///
/// 1. Wait until the next height is committed on chain
/// 2. Fetch its transactions
/// 3. Run block hooks, then every handler on every message in order
/// 4. Move on to the next height
pub struct IndexerService<S: TxSource> {
    config: IndexerConfig,
    source: Arc<S>,
    handlers: Arc<HandlerRegistry>,
}

impl<S: TxSource> IndexerService<S> {
    pub fn new(config: IndexerConfig, source: Arc<S>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            config,
            source,
            handlers,
        }
    }

    /// Start the indexer.
    ///
    /// Returns `Ok(())` once `end_height` is indexed, or
    /// [`IndexerError::ShutdownRequested`] when the shutdown signal fires.
    #[instrument(skip_all, fields(from = self.config.start_height, to = ?self.config.end_height))]
    pub async fn run(
        &self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> IndexerResult<()> {
        if let Some(end) = self.config.end_height
            && end < self.config.start_height
        {
            return Err(IndexerError::ConfigError(format!(
                "end height {} is below start height {}",
                end, self.config.start_height
            )));
        }

        info!(handlers = self.handlers.len(), "⛓️  Starting indexer");

        let mut height = self.config.start_height;
        loop {
            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(IndexerError::ShutdownRequested);
            }

            if let Some(end) = self.config.end_height
                && height > end
            {
                info!(last = end, "✅ Requested range indexed");
                return Ok(());
            }

            let latest = self.source.latest_height().await?;
            if height > latest {
                trace!(height, latest, "Waiting for next block");
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            return Err(IndexerError::ShutdownRequested);
                        }
                    }
                }
                continue;
            }

            let txs = self.source.txs_at_height(height).await?;
            self.process_block(height, &txs).await?;
            info!(block = height, txs = txs.len(), "⛓️  Block indexed");
            height += 1;
        }
    }

    /// Process a single block through all handlers.
    #[instrument(skip(self, txs), fields(txs = txs.len()))]
    pub async fn process_block(&self, height: u64, txs: &[Tx]) -> IndexerResult<()> {
        let _timer = ProcessingTimer::new();

        for handler in self.handlers.all() {
            if let Err(e) = handler.on_block(height).await {
                warn!(handler = handler.name(), error = ?e, "⚠️  Block hook failed");
                record_handler_error(handler.name(), e.kind());
                return Err(e.into());
            }
        }

        for tx in txs {
            self.process_tx(tx).await?;
        }

        record_block_indexed();
        trace!("Block processed successfully");
        Ok(())
    }

    /// Dispatch every message of `tx`, in order, to every handler.
    pub async fn process_tx(&self, tx: &Tx) -> IndexerResult<()> {
        for (index, msg) in tx.messages.iter().enumerate() {
            for handler in self.handlers.all() {
                if let Err(e) = handler.handle_msg(index, msg, tx).await {
                    warn!(
                        height = tx.height,
                        tx = %tx.hash,
                        msg_index = index,
                        handler = handler.name(),
                        error = %e,
                        "❌ Message processing failed"
                    );
                    record_handler_error(handler.name(), e.kind());
                    return Err(IndexerError::Message {
                        height: tx.height,
                        tx_hash: tx.hash.clone(),
                        msg_index: index,
                        handler: handler.name(),
                        source: e,
                    });
                }
            }
        }
        Ok(())
    }
}
