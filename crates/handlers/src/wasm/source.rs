//! Chain state the wasm handler needs beyond the transaction log.

use async_trait::async_trait;

use quill_core::error::SourceResult;

use super::models::Params;

/// Contract metadata that only the chain state holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInfo {
    pub creator: String,
    /// Extension as JSON text, empty when absent.
    pub extension: String,
}

/// Live queries against the wasm module state.
///
/// Results are never cached by callers; each call reflects the state at the
/// requested height.
#[async_trait]
pub trait WasmSource: Send + Sync {
    /// Contract info of `address` as of `height`.
    ///
    /// Returns `SourceError::NotFound` when the contract does not exist there.
    async fn get_contract_info(&self, height: u64, address: &str) -> SourceResult<ContractInfo>;

    /// Module parameters as of `height`.
    async fn get_params(&self, height: u64) -> SourceResult<Params>;
}
