//! JSON shapes returned by the Cosmos SDK LCD (gRPC gateway).
//!
//! Only the fields the indexer reads are modelled. Integers encoded as
//! strings are parsed here so the rest of the crate deals in native types.

use serde::Deserialize;

use quill_core::error::{SourceError, SourceResult};
use quill_core::models::{RawMessage, StringEvent, Tx, TxLog};
use quill_handlers::utils::serde_helpers::u64_from_str_or_num;
use quill_handlers::wasm::{ContractInfo, Params};

// =============================================================================
// Blocks
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct LatestBlockResponse {
    pub block: BlockJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockJson {
    pub header: HeaderJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeaderJson {
    #[serde(default)]
    pub chain_id: String,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub height: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeInfoResponse {
    #[serde(default)]
    pub application_version: Option<VersionInfoJson>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionInfoJson {
    #[serde(default)]
    pub cosmos_sdk_version: String,
}

/// Whether a node with this SDK version searches txs with `query=`.
///
/// v0.50 replaced `events` with `query` in `GetTxsEvent`. Versions that
/// cannot be read (forks, custom builds) are assumed recent.
pub(crate) fn supports_query_search(cosmos_sdk_version: &str) -> bool {
    let mut parts = cosmos_sdk_version.trim_start_matches('v').split('.').map(|p| {
        p.chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse::<u64>()
    });

    match (parts.next(), parts.next()) {
        (Some(Ok(major)), Some(Ok(minor))) => (major, minor) >= (0, 50),
        _ => true,
    }
}

// =============================================================================
// Transactions
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GetTxsEventResponse {
    #[serde(default)]
    pub tx_responses: Vec<TxResponseJson>,
    /// Total hits; 0 when the node does not report it.
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxResponseJson {
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub height: u64,
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub logs: Vec<TxLog>,
    /// Flat event list; the only place events live on SDK v0.50+.
    #[serde(default)]
    pub events: Vec<StringEvent>,
    pub tx: TxJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxJson {
    pub body: TxBodyJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxBodyJson {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

impl TxResponseJson {
    pub fn into_tx(self) -> SourceResult<Tx> {
        let messages = self
            .tx
            .body
            .messages
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                RawMessage::from_json(value).ok_or_else(|| {
                    SourceError::InvalidResponse(format!(
                        "tx {} message {} has no @type",
                        self.txhash, i
                    ))
                })
            })
            .collect::<SourceResult<Vec<_>>>()?;

        let logs = if self.logs.is_empty() && self.code == 0 {
            logs_from_events(self.events)
        } else {
            self.logs
        };

        Ok(Tx {
            hash: self.txhash,
            height: self.height,
            timestamp: self.timestamp,
            code: self.code,
            messages,
            logs,
        })
    }
}

/// Rebuild per-message logs from a flat event list.
///
/// Events emitted by a message carry a `msg_index` attribute; events without
/// one belong to the transaction itself (fees, signatures) and are dropped.
fn logs_from_events(events: Vec<StringEvent>) -> Vec<TxLog> {
    let mut logs: Vec<TxLog> = Vec::new();
    for event in events {
        let Some(index) = event.attribute("msg_index").and_then(|v| v.parse::<usize>().ok())
        else {
            continue;
        };
        match logs.iter_mut().find(|log| log.msg_index == index) {
            Some(log) => log.events.push(event),
            None => logs.push(TxLog {
                msg_index: index,
                events: vec![event],
            }),
        }
    }
    logs.sort_by_key(|log| log.msg_index);
    logs
}

// =============================================================================
// Wasm queries
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct ContractInfoResponse {
    pub contract_info: ContractInfoJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContractInfoJson {
    pub creator: String,
    #[serde(default)]
    pub extension: Option<serde_json::Value>,
}

impl From<ContractInfoJson> for ContractInfo {
    fn from(info: ContractInfoJson) -> Self {
        Self {
            creator: info.creator,
            extension: match info.extension {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(ext) => ext.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParamsResponse {
    pub params: Params,
}

/// gRPC gateway error body.
#[derive(Debug, Deserialize)]
pub(crate) struct GatewayError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// gRPC `NOT_FOUND`.
pub(crate) const GRPC_NOT_FOUND: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_block_height_as_string() {
        let resp: LatestBlockResponse = serde_json::from_value(json!({
            "block_id": {"hash": "AA=="},
            "block": {"header": {"chain_id": "wasm-1", "height": "123456", "time": "2024-01-01T00:00:00Z"}}
        }))
        .unwrap();
        assert_eq!(resp.block.header.height, 123456);
        assert_eq!(resp.block.header.chain_id, "wasm-1");
    }

    fn tx_response(logs: serde_json::Value, events: serde_json::Value) -> TxResponseJson {
        serde_json::from_value(json!({
            "height": "42",
            "txhash": "ABC",
            "code": 0,
            "timestamp": "2024-01-01T00:00:00Z",
            "logs": logs,
            "events": events,
            "tx": {
                "@type": "/cosmos.tx.v1beta1.Tx",
                "body": {
                    "messages": [{
                        "@type": "/cosmwasm.wasm.v1.MsgClearAdmin",
                        "sender": "wasm1s",
                        "contract": "wasm1c"
                    }]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_tx_response_with_logs() {
        let tx = tx_response(
            json!([{"msg_index": 0, "log": "", "events": [{"type": "message", "attributes": [{"key": "action", "value": "clear"}]}]}]),
            json!([]),
        )
        .into_tx()
        .unwrap();

        assert_eq!(tx.height, 42);
        assert_eq!(tx.hash, "ABC");
        assert_eq!(tx.messages[0].type_url, "/cosmwasm.wasm.v1.MsgClearAdmin");
        assert!(tx.has_events());
        assert!(tx.find_event_by_type(0, "message").is_ok());
    }

    // SDK v0.50+: logs vides, events à plat avec attribut msg_index
    #[test]
    fn test_tx_response_logs_rebuilt_from_events() {
        let tx = tx_response(
            json!([]),
            json!([
                {"type": "tx", "attributes": [{"key": "fee", "value": "1ustake", "index": true}]},
                {"type": "execute", "attributes": [
                    {"key": "_contract_address", "value": "wasm1c", "index": true},
                    {"key": "msg_index", "value": "1", "index": true}
                ]},
                {"type": "store_code", "attributes": [
                    {"key": "code_id", "value": "7", "index": true},
                    {"key": "msg_index", "value": "0", "index": true}
                ]}
            ]),
        )
        .into_tx()
        .unwrap();

        assert_eq!(tx.logs.len(), 2);
        assert_eq!(tx.logs[0].msg_index, 0);
        let ev = tx.find_event_by_type(0, "store_code").unwrap();
        assert_eq!(ev.attribute("code_id"), Some("7"));
        assert!(tx.find_event_by_type(1, "execute").is_ok());
        // L'event "tx" sans msg_index est ignoré
        assert!(tx.find_event_by_type(0, "tx").is_err());
    }

    #[test]
    fn test_tx_response_message_without_type_is_invalid() {
        let mut resp = tx_response(json!([]), json!([]));
        resp.tx.body.messages = vec![json!({"sender": "x"})];
        assert!(matches!(resp.into_tx(), Err(SourceError::InvalidResponse(_))));
    }

    #[test]
    fn test_contract_info_extension() {
        let resp: ContractInfoResponse = serde_json::from_value(json!({
            "address": "wasm1c",
            "contract_info": {"code_id": "1", "creator": "wasm1creator", "admin": "", "label": "x", "extension": null}
        }))
        .unwrap();
        let info = ContractInfo::from(resp.contract_info);
        assert_eq!(info.creator, "wasm1creator");
        assert_eq!(info.extension, "");

        let with_ext = ContractInfoJson {
            creator: "c".into(),
            extension: Some(json!({"@type": "/x.Ext", "v": 1})),
        };
        assert_eq!(ContractInfo::from(with_ext).extension, r#"{"@type":"/x.Ext","v":1}"#);
    }

    #[test]
    fn test_txs_total_optional() {
        let resp: GetTxsEventResponse =
            serde_json::from_value(json!({"txs": [], "tx_responses": [], "total": "250"})).unwrap();
        assert_eq!(resp.total, 250);

        let resp: GetTxsEventResponse = serde_json::from_value(json!({"tx_responses": []})).unwrap();
        assert_eq!(resp.total, 0);
    }

    #[test]
    fn test_node_info_sdk_version() {
        let resp: NodeInfoResponse = serde_json::from_value(json!({
            "default_node_info": {"network": "wasm-1"},
            "application_version": {"name": "wasmd", "cosmos_sdk_version": "v0.50.3"}
        }))
        .unwrap();
        assert_eq!(resp.application_version.unwrap().cosmos_sdk_version, "v0.50.3");
    }

    // Test critique: v0.50+ exige `query`, les versions antérieures `events`
    #[test]
    fn test_supports_query_search() {
        assert!(supports_query_search("v0.50.1"));
        assert!(supports_query_search("v0.53.0"));
        assert!(supports_query_search("v1.0.0"));
        assert!(!supports_query_search("v0.47.5-ics-lsm"));
        assert!(!supports_query_search("v0.45.16"));
        assert!(supports_query_search(""));
        assert!(supports_query_search("unknown"));
    }

    #[test]
    fn test_params_response() {
        let resp: ParamsResponse = serde_json::from_value(json!({
            "params": {
                "code_upload_access": {"permission": "ACCESS_TYPE_EVERYBODY", "addresses": []},
                "instantiate_default_permission": "ACCESS_TYPE_EVERYBODY"
            }
        }))
        .unwrap();
        assert_eq!(resp.params.max_wasm_code_size, 0);
    }
}
