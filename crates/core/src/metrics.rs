//! Metrics definitions for the indexer.
//!
//! This module defines all metrics used throughout the indexer.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "messages_handled_total",
        "Total number of messages turned into records or updates"
    );
    describe_counter!(
        "decode_errors_total",
        "Total number of payload decode errors during message processing"
    );
    describe_counter!(
        "blocks_indexed_total",
        "Total number of blocks successfully indexed"
    );
    describe_histogram!(
        "block_processing_duration_seconds",
        "Time taken to process a block in seconds"
    );
    describe_counter!(
        "handler_errors_total",
        "Total number of handler errors during message processing"
    );
}

/// Record a message handled by a module.
///
/// # Arguments
/// * `kind` - The message kind (e.g. "store_code", "instantiate")
pub fn record_message_handled(kind: &str) {
    counter!("messages_handled_total", "kind" => kind.to_string()).increment(1);
}

/// Record a decode error.
///
/// # Arguments
/// * `field` - The attribute or field that failed to decode
pub fn record_decode_error(field: &str) {
    counter!("decode_errors_total", "field" => field.to_string()).increment(1);
}

/// Record a successfully indexed block.
pub fn record_block_indexed() {
    counter!("blocks_indexed_total").increment(1);
}

/// Record block processing duration.
pub fn record_block_processing_duration(duration_secs: f64) {
    histogram!("block_processing_duration_seconds").record(duration_secs);
}

/// Record a handler error.
///
/// # Arguments
/// * `handler` - The handler name
/// * `kind` - The error kind ("lookup", "decode", "source", "storage", ...)
pub fn record_handler_error(handler: &str, kind: &str) {
    counter!("handler_errors_total", "handler" => handler.to_string(), "kind" => kind.to_string())
        .increment(1);
}

/// A timer that automatically records duration when dropped.
pub struct ProcessingTimer {
    start: Instant,
}

impl ProcessingTimer {
    /// Start a new processing timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for ProcessingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessingTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_block_processing_duration(duration);
    }
}
