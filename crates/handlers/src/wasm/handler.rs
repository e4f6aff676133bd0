//! Handler for the CosmWasm `x/wasm` module.
//!
//! Turns wasm messages and the events they emitted into records.
//!
//! # Supported Messages
//!
//! | Message | Event | Attributes | Output |
//! |---|---|---|---|
//! | `MsgStoreCode` | `store_code` | `code_id` | [`WasmCode`] |
//! | `MsgInstantiateContract` | `instantiate` | `_contract_address`, `result` | [`WasmContract`] |
//! | `MsgExecuteContract` | `execute` | `result` | [`WasmExecuteContract`] |
//! | `MsgMigrateContract` | `migrate` | `result` | code/message/data update |
//! | `MsgUpdateAdmin` | none | none | admin update |
//! | `MsgClearAdmin` | none | none | admin cleared |

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use quill_core::error::{DecodeError, DomainResult};
use quill_core::metrics::{record_decode_error, record_message_handled};
use quill_core::models::{RawMessage, Tx};
use quill_core::ports::MessageHandler;

use crate::utils::{decode_result_data, parse_code_id, parse_timestamp};

use super::models::{WasmCode, WasmContract, WasmExecuteContract, WasmParams};
use super::msgs::{
    MsgClearAdmin, MsgExecuteContract, MsgInstantiateContract, MsgMigrateContract, MsgStoreCode,
    MsgUpdateAdmin, WasmMsg,
};
use super::source::WasmSource;
use super::storage::WasmStorage;

// =============================================================================
// Event & attribute names
// =============================================================================

pub const EVENT_TYPE_STORE_CODE: &str = "store_code";
pub const EVENT_TYPE_INSTANTIATE: &str = "instantiate";
pub const EVENT_TYPE_EXECUTE: &str = "execute";
pub const EVENT_TYPE_MIGRATE: &str = "migrate";

pub const ATTRIBUTE_KEY_CODE_ID: &str = "code_id";
pub const ATTRIBUTE_KEY_CONTRACT_ADDR: &str = "_contract_address";
pub const ATTRIBUTE_KEY_RESULT_DATA: &str = "result";

/// Default number of blocks between two params snapshots.
pub const DEFAULT_PARAMS_REFRESH_INTERVAL: u64 = 100;

// =============================================================================
// Handler
// =============================================================================

/// Handler for the wasm module.
///
/// Stateless: every message is extracted independently. The source and the
/// storage are the only collaborators.
pub struct WasmHandler {
    source: Arc<dyn WasmSource>,
    storage: Arc<dyn WasmStorage>,
    params_refresh_interval: u64,
}

impl WasmHandler {
    pub fn new(source: Arc<dyn WasmSource>, storage: Arc<dyn WasmStorage>) -> Self {
        Self {
            source,
            storage,
            params_refresh_interval: DEFAULT_PARAMS_REFRESH_INTERVAL,
        }
    }

    /// Snapshot params every `interval` blocks; 0 disables snapshots.
    pub fn with_params_refresh_interval(mut self, interval: u64) -> Self {
        self.params_refresh_interval = interval;
        self
    }

    async fn handle_store_code(&self, index: usize, tx: &Tx, msg: &MsgStoreCode) -> DomainResult<()> {
        let event = tx.find_event_by_type(index, EVENT_TYPE_STORE_CODE)?;
        let code_id = tx.find_attribute_by_key(event, ATTRIBUTE_KEY_CODE_ID)?;
        let code_id = decoded(parse_code_id("store_code.code_id", code_id))?;

        let code = WasmCode::new(msg, code_id, tx.height);
        debug!(height = tx.height, code_id, sender = %code.sender, "Storing wasm code");
        self.storage.save_wasm_code(&code).await?;
        Ok(())
    }

    async fn handle_instantiate_contract(
        &self,
        index: usize,
        tx: &Tx,
        msg: &MsgInstantiateContract,
    ) -> DomainResult<()> {
        let event = tx.find_event_by_type(index, EVENT_TYPE_INSTANTIATE)?;
        let contract_address = tx.find_attribute_by_key(event, ATTRIBUTE_KEY_CONTRACT_ADDR)?;
        let result = tx.find_attribute_by_key(event, ATTRIBUTE_KEY_RESULT_DATA)?;
        let data = decoded(decode_result_data("instantiate.result", result))?;

        let info = self.source.get_contract_info(tx.height, contract_address).await?;
        let instantiated_at = decoded(parse_timestamp("tx.timestamp", &tx.timestamp))?;

        let contract = WasmContract::new(
            msg,
            contract_address,
            data,
            instantiated_at,
            info.creator,
            info.extension,
            tx.height,
        );
        debug!(
            height = tx.height,
            contract = %contract.contract_address,
            code_id = contract.code_id,
            "Storing wasm contract"
        );
        self.storage.save_wasm_contract(&contract).await?;
        Ok(())
    }

    async fn handle_execute_contract(
        &self,
        index: usize,
        tx: &Tx,
        msg: &MsgExecuteContract,
    ) -> DomainResult<()> {
        let event = tx.find_event_by_type(index, EVENT_TYPE_EXECUTE)?;
        let result = tx.find_attribute_by_key(event, ATTRIBUTE_KEY_RESULT_DATA)?;
        let data = decoded(decode_result_data("execute.result", result))?;
        let executed_at = decoded(parse_timestamp("tx.timestamp", &tx.timestamp))?;

        let execute =
            WasmExecuteContract::new(msg, &tx.hash, index as u64, data, executed_at, tx.height);
        debug!(height = tx.height, contract = %execute.contract_address, "Storing wasm execution");
        self.storage.save_wasm_execute_contract(&execute).await?;
        Ok(())
    }

    /// Code id and migrate message come from the message itself; only the
    /// result data is read from the event.
    async fn handle_migrate_contract(
        &self,
        index: usize,
        tx: &Tx,
        msg: &MsgMigrateContract,
    ) -> DomainResult<()> {
        let event = tx.find_event_by_type(index, EVENT_TYPE_MIGRATE)?;
        let result = tx.find_attribute_by_key(event, ATTRIBUTE_KEY_RESULT_DATA)?;
        let data = decoded(decode_result_data("migrate.result", result))?;

        debug!(height = tx.height, contract = %msg.contract, code_id = msg.code_id, "Migrating wasm contract");
        self.storage
            .update_contract_with_msg_migrate_contract(&msg.sender, &msg.contract, msg.code_id, &msg.msg, &data)
            .await?;
        Ok(())
    }

    async fn handle_update_admin(&self, msg: &MsgUpdateAdmin) -> DomainResult<()> {
        debug!(contract = %msg.contract, admin = %msg.new_admin, "Updating contract admin");
        self.storage
            .update_contract_admin(&msg.sender, &msg.contract, &msg.new_admin)
            .await?;
        Ok(())
    }

    async fn handle_clear_admin(&self, msg: &MsgClearAdmin) -> DomainResult<()> {
        debug!(contract = %msg.contract, "Clearing contract admin");
        self.storage
            .update_contract_admin(&msg.sender, &msg.contract, "")
            .await?;
        Ok(())
    }
}

/// Count decode failures by field before propagating them.
fn decoded<T>(result: Result<T, DecodeError>) -> Result<T, DecodeError> {
    result.inspect_err(|e| record_decode_error(e.field()))
}

#[async_trait]
impl MessageHandler for WasmHandler {
    fn name(&self) -> &'static str {
        "wasm"
    }

    async fn handle_msg(&self, index: usize, msg: &RawMessage, tx: &Tx) -> DomainResult<()> {
        // Failed txs carry no events, there is nothing to extract
        if !tx.has_events() {
            return Ok(());
        }

        let Some(msg) = WasmMsg::from_raw(msg).inspect_err(|e| record_decode_error(e.field()))?
        else {
            return Ok(());
        };

        let result = match &msg {
            WasmMsg::StoreCode(m) => self.handle_store_code(index, tx, m).await,
            WasmMsg::InstantiateContract(m) => self.handle_instantiate_contract(index, tx, m).await,
            WasmMsg::ExecuteContract(m) => self.handle_execute_contract(index, tx, m).await,
            WasmMsg::MigrateContract(m) => self.handle_migrate_contract(index, tx, m).await,
            WasmMsg::UpdateAdmin(m) => self.handle_update_admin(m).await,
            WasmMsg::ClearAdmin(m) => self.handle_clear_admin(m).await,
        };

        if let Err(e) = &result {
            warn!(
                height = tx.height,
                tx = %tx.hash,
                msg_index = index,
                kind = msg.kind(),
                error = %e,
                "Failed to handle wasm message"
            );
        } else {
            record_message_handled(msg.kind());
        }
        result
    }

    async fn on_block(&self, height: u64) -> DomainResult<()> {
        if self.params_refresh_interval == 0 || height % self.params_refresh_interval != 0 {
            return Ok(());
        }

        let params = self.source.get_params(height).await?;
        debug!(height, "Storing wasm params snapshot");
        self.storage
            .save_wasm_params(&WasmParams::new(params, height))
            .await?;
        Ok(())
    }

    fn priority(&self) -> i32 {
        10
    }
}
