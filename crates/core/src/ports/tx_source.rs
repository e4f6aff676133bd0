//! Port trait for the transaction data source.
//!
//! This trait defines the interface for fetching the transactions of a
//! block from a Cosmos SDK chain. Implementations live in the
//! infrastructure layer (e.g., `quill-cosmos`).

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::models::Tx;

/// Port trait for a transaction data source.
#[async_trait]
pub trait TxSource: Send + Sync {
    /// Height of the latest committed block.
    async fn latest_height(&self) -> SourceResult<u64>;

    /// All transactions included at `height`, in block order.
    ///
    /// Failed transactions are included; they carry no logs.
    async fn txs_at_height(&self, height: u64) -> SourceResult<Vec<Tx>>;
}
