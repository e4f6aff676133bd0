//! CosmWasm `x/wasm` handler bundle.
//!
//! Indexes contract code uploads, instantiations, executions, migrations and
//! admin changes, plus periodic snapshots of the module parameters.
//!
//! # Indexed Messages
//!
//! - `MsgStoreCode` - Uploaded byte code
//! - `MsgInstantiateContract` - New contracts
//! - `MsgExecuteContract` - Contract executions
//! - `MsgMigrateContract` - Code id changes of existing contracts
//! - `MsgUpdateAdmin` / `MsgClearAdmin` - Admin changes
//!
//! # Database Tables
//!
//! - `wasm_code`, `wasm_contract`, `wasm_execute_contract`, `wasm_params`
//!
//! # Usage
//!
//! ```ignore
//! use quill_handlers::WasmBundle;
//!
//! let bundle = WasmBundle::new(pool, cosmos_client.clone());
//! registry.register(Box::new(bundle));
//! ```

mod handler;
pub mod models;
pub mod msgs;
pub mod source;
pub mod storage;

use std::sync::Arc;

use quill_core::ports::MessageHandler;
use sqlx::PgPool;

use crate::HandlerBundle;

pub use handler::{
    ATTRIBUTE_KEY_CODE_ID, ATTRIBUTE_KEY_CONTRACT_ADDR, ATTRIBUTE_KEY_RESULT_DATA,
    DEFAULT_PARAMS_REFRESH_INTERVAL, EVENT_TYPE_EXECUTE, EVENT_TYPE_INSTANTIATE,
    EVENT_TYPE_MIGRATE, EVENT_TYPE_STORE_CODE, WasmHandler,
};
pub use models::{AccessConfig, AccessType, Coin, Params, WasmCode, WasmContract, WasmExecuteContract, WasmParams};
pub use msgs::WasmMsg;
pub use source::{ContractInfo, WasmSource};
pub use storage::{MIGRATIONS, PgWasmStorage, WasmStorage};

/// Tables created by [`MIGRATIONS`], children first.
pub(crate) const TABLES: &[&str] = &[
    "wasm_execute_contract",
    "wasm_contract",
    "wasm_code",
    "wasm_params",
];

/// Handler bundle for the wasm module.
pub struct WasmBundle {
    pool: PgPool,
    source: Arc<dyn WasmSource>,
    params_refresh_interval: u64,
}

impl WasmBundle {
    /// Create a new wasm bundle.
    pub fn new(pool: PgPool, source: Arc<dyn WasmSource>) -> Self {
        Self {
            pool,
            source,
            params_refresh_interval: DEFAULT_PARAMS_REFRESH_INTERVAL,
        }
    }

    /// Blocks between two params snapshots; 0 disables them.
    pub fn with_params_refresh_interval(mut self, interval: u64) -> Self {
        self.params_refresh_interval = interval;
        self
    }
}

impl HandlerBundle for WasmBundle {
    fn name(&self) -> &'static str {
        "wasm"
    }

    fn handlers(&self) -> Vec<Arc<dyn MessageHandler>> {
        let storage = Arc::new(PgWasmStorage::new(self.pool.clone()));
        let handler = WasmHandler::new(self.source.clone(), storage)
            .with_params_refresh_interval(self.params_refresh_interval);
        vec![Arc::new(handler)]
    }

    fn migrations(&self) -> &'static [&'static str] {
        MIGRATIONS
    }

    fn tables_to_purge(&self) -> &'static [&'static str] {
        TABLES
    }
}
