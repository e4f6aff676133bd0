//! Typed `x/wasm` transaction messages.
//!
//! [`WasmMsg`] is the closed set of messages the wasm handler reacts to.
//! Bodies follow the JSON encoding of Cosmos SDK nodes: 64-bit integers may be
//! strings, `wasm_byte_code` is base64 and contract messages are embedded JSON.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use quill_core::error::DecodeError;
use quill_core::models::RawMessage;

use crate::utils::serde_helpers::{bytes_from_base64, u64_from_str_or_num};

use super::models::{AccessConfig, Coin};

pub const MSG_STORE_CODE: &str = "/cosmwasm.wasm.v1.MsgStoreCode";
pub const MSG_INSTANTIATE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgInstantiateContract";
pub const MSG_EXECUTE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";
pub const MSG_MIGRATE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgMigrateContract";
pub const MSG_UPDATE_ADMIN: &str = "/cosmwasm.wasm.v1.MsgUpdateAdmin";
pub const MSG_CLEAR_ADMIN: &str = "/cosmwasm.wasm.v1.MsgClearAdmin";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MsgStoreCode {
    pub sender: String,
    #[serde(deserialize_with = "bytes_from_base64")]
    pub wasm_byte_code: Vec<u8>,
    #[serde(default)]
    pub instantiate_permission: Option<AccessConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MsgInstantiateContract {
    pub sender: String,
    #[serde(default)]
    pub admin: String,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub code_id: u64,
    #[serde(default)]
    pub label: String,
    pub msg: serde_json::Value,
    #[serde(default)]
    pub funds: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MsgExecuteContract {
    pub sender: String,
    pub contract: String,
    pub msg: serde_json::Value,
    #[serde(default)]
    pub funds: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MsgMigrateContract {
    pub sender: String,
    pub contract: String,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub code_id: u64,
    pub msg: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MsgUpdateAdmin {
    pub sender: String,
    pub new_admin: String,
    pub contract: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MsgClearAdmin {
    pub sender: String,
    pub contract: String,
}

/// A message of the wasm module.
#[derive(Debug, Clone, PartialEq)]
pub enum WasmMsg {
    StoreCode(MsgStoreCode),
    InstantiateContract(MsgInstantiateContract),
    ExecuteContract(MsgExecuteContract),
    MigrateContract(MsgMigrateContract),
    UpdateAdmin(MsgUpdateAdmin),
    ClearAdmin(MsgClearAdmin),
}

impl WasmMsg {
    /// Decode a raw message.
    ///
    /// Returns `Ok(None)` for messages of other modules. A known type URL
    /// whose body does not match the expected shape is a [`DecodeError`].
    pub fn from_raw(raw: &RawMessage) -> Result<Option<Self>, DecodeError> {
        let msg = match raw.type_url.as_str() {
            MSG_STORE_CODE => WasmMsg::StoreCode(decode_body(raw)?),
            MSG_INSTANTIATE_CONTRACT => WasmMsg::InstantiateContract(decode_body(raw)?),
            MSG_EXECUTE_CONTRACT => WasmMsg::ExecuteContract(decode_body(raw)?),
            MSG_MIGRATE_CONTRACT => WasmMsg::MigrateContract(decode_body(raw)?),
            MSG_UPDATE_ADMIN => WasmMsg::UpdateAdmin(decode_body(raw)?),
            MSG_CLEAR_ADMIN => WasmMsg::ClearAdmin(decode_body(raw)?),
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }

    /// Short name used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            WasmMsg::StoreCode(_) => "store_code",
            WasmMsg::InstantiateContract(_) => "instantiate",
            WasmMsg::ExecuteContract(_) => "execute",
            WasmMsg::MigrateContract(_) => "migrate",
            WasmMsg::UpdateAdmin(_) => "update_admin",
            WasmMsg::ClearAdmin(_) => "clear_admin",
        }
    }
}

fn decode_body<T: DeserializeOwned>(raw: &RawMessage) -> Result<T, DecodeError> {
    T::deserialize(&raw.value).map_err(|e| DecodeError::Message {
        type_url: raw.type_url.clone(),
        message: e.to_string(),
    })
}
