//! Records for the CosmWasm `x/wasm` module.
//!
//! Each record is built once from a decoded message, the data found in its
//! execution log and the height it was included at. Records are never
//! rewritten afterwards; later changes to a contract go through the targeted
//! updates of [`super::storage::WasmStorage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::serde_helpers::u64_from_str_or_num;

use super::msgs::{MsgExecuteContract, MsgInstantiateContract, MsgStoreCode};

// =============================================================================
// Shared types
// =============================================================================

/// Who may upload code or instantiate it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessType {
    #[default]
    #[serde(rename = "ACCESS_TYPE_UNSPECIFIED", alias = "Unspecified")]
    Unspecified,
    #[serde(rename = "ACCESS_TYPE_NOBODY", alias = "Nobody")]
    Nobody,
    #[serde(rename = "ACCESS_TYPE_ONLY_ADDRESS", alias = "OnlyAddress")]
    OnlyAddress,
    #[serde(rename = "ACCESS_TYPE_EVERYBODY", alias = "Everybody")]
    Everybody,
    #[serde(rename = "ACCESS_TYPE_ANY_OF_ADDRESSES", alias = "AnyOfAddresses")]
    AnyOfAddresses,
}

impl AccessType {
    /// Canonical protobuf enum name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Unspecified => "ACCESS_TYPE_UNSPECIFIED",
            AccessType::Nobody => "ACCESS_TYPE_NOBODY",
            AccessType::OnlyAddress => "ACCESS_TYPE_ONLY_ADDRESS",
            AccessType::Everybody => "ACCESS_TYPE_EVERYBODY",
            AccessType::AnyOfAddresses => "ACCESS_TYPE_ANY_OF_ADDRESSES",
        }
    }
}

/// Access policy attached to code uploads and instantiation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub permission: AccessType,
    /// Single address, used by `OnlyAddress` on older chains.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// A denomination/amount pair. Amounts stay decimal strings, they exceed `u64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

// =============================================================================
// Params
// =============================================================================

/// Module parameters as returned by the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub code_upload_access: AccessConfig,
    #[serde(default)]
    pub instantiate_default_permission: AccessType,
    /// Dropped from the params of recent wasmd releases; 0 when absent.
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub max_wasm_code_size: u64,
}

/// Snapshot of the module parameters at a height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WasmParams {
    pub code_upload_access: AccessConfig,
    pub instantiate_default_permission: AccessType,
    pub max_wasm_code_size: u64,
    pub height: u64,
}

impl WasmParams {
    pub fn new(params: Params, height: u64) -> Self {
        Self {
            code_upload_access: params.code_upload_access,
            instantiate_default_permission: params.instantiate_default_permission,
            max_wasm_code_size: params.max_wasm_code_size,
            height,
        }
    }
}

// =============================================================================
// Code
// =============================================================================

/// Uploaded contract byte code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WasmCode {
    pub sender: String,
    /// Opaque; never inspected.
    #[serde(skip)]
    pub wasm_byte_code: Vec<u8>,
    pub instantiate_permission: Option<AccessConfig>,
    pub code_id: u64,
    pub height: u64,
}

impl WasmCode {
    pub fn new(msg: &MsgStoreCode, code_id: u64, height: u64) -> Self {
        Self {
            sender: msg.sender.clone(),
            wasm_byte_code: msg.wasm_byte_code.clone(),
            instantiate_permission: msg.instantiate_permission.clone(),
            code_id,
            height,
        }
    }
}

// =============================================================================
// Contract
// =============================================================================

/// An instantiated contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasmContract {
    pub sender: String,
    pub creator: String,
    /// Empty when the contract has no admin.
    pub admin: String,
    pub code_id: u64,
    pub label: String,
    pub raw_contract_msg: serde_json::Value,
    pub funds: Vec<Coin>,
    pub contract_address: String,
    /// Result data returned by the contract, may be empty.
    pub data: String,
    pub instantiated_at: DateTime<Utc>,
    /// Contract info extension as JSON text, empty when the chain reports none.
    pub contract_info_extension: String,
    pub height: u64,
}

impl WasmContract {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg: &MsgInstantiateContract,
        contract_address: &str,
        data: String,
        instantiated_at: DateTime<Utc>,
        creator: String,
        contract_info_extension: String,
        height: u64,
    ) -> Self {
        Self {
            sender: msg.sender.clone(),
            creator,
            admin: msg.admin.clone(),
            code_id: msg.code_id,
            label: msg.label.clone(),
            raw_contract_msg: msg.msg.clone(),
            funds: msg.funds.clone(),
            contract_address: contract_address.to_string(),
            data,
            instantiated_at,
            contract_info_extension,
            height,
        }
    }
}

// =============================================================================
// Execute
// =============================================================================

/// A single contract execution, keyed by the message that carried it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasmExecuteContract {
    pub tx_hash: String,
    pub msg_index: u64,
    pub sender: String,
    pub contract_address: String,
    pub raw_contract_msg: serde_json::Value,
    pub funds: Vec<Coin>,
    pub data: String,
    pub executed_at: DateTime<Utc>,
    pub height: u64,
}

impl WasmExecuteContract {
    pub fn new(
        msg: &MsgExecuteContract,
        tx_hash: &str,
        msg_index: u64,
        data: String,
        executed_at: DateTime<Utc>,
        height: u64,
    ) -> Self {
        Self {
            tx_hash: tx_hash.to_string(),
            msg_index,
            sender: msg.sender.clone(),
            contract_address: msg.contract.clone(),
            raw_contract_msg: msg.msg.clone(),
            funds: msg.funds.clone(),
            data,
            executed_at,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Les nodes renvoient l'enum sous sa forme protobuf ou sa forme courte
    #[test]
    fn test_access_type_accepts_both_spellings() {
        let long: AccessType = serde_json::from_value(json!("ACCESS_TYPE_EVERYBODY")).unwrap();
        let short: AccessType = serde_json::from_value(json!("Everybody")).unwrap();
        assert_eq!(long, AccessType::Everybody);
        assert_eq!(short, AccessType::Everybody);
        assert_eq!(long.as_str(), "ACCESS_TYPE_EVERYBODY");
        assert_eq!(serde_json::to_value(long).unwrap(), json!("ACCESS_TYPE_EVERYBODY"));
    }

    #[test]
    fn test_params_without_max_code_size() {
        let params: Params = serde_json::from_value(json!({
            "code_upload_access": {"permission": "Everybody", "addresses": []},
            "instantiate_default_permission": "Everybody"
        }))
        .unwrap();
        assert_eq!(params.max_wasm_code_size, 0);

        let record = WasmParams::new(params, 500);
        assert_eq!(record.height, 500);
        assert_eq!(record.code_upload_access.permission, AccessType::Everybody);
    }

    #[test]
    fn test_contract_record_takes_message_fields() {
        let msg = MsgInstantiateContract {
            sender: "wasm1sender".into(),
            admin: String::new(),
            code_id: 7,
            label: "cw20".into(),
            msg: json!({"name": "token"}),
            funds: vec![Coin { denom: "ustake".into(), amount: "10".into() }],
        };
        let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);

        let contract = WasmContract::new(
            &msg,
            "wasm1contract",
            String::new(),
            at,
            "wasm1creator".into(),
            String::new(),
            42,
        );

        assert_eq!(contract.contract_address, "wasm1contract");
        assert_eq!(contract.code_id, 7);
        assert_eq!(contract.creator, "wasm1creator");
        assert!(contract.admin.is_empty());
        assert_eq!(contract.funds.len(), 1);
        assert_eq!(contract.height, 42);
    }
}
