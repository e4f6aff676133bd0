//! Transaction models consumed by the indexer.
//!
//! These mirror the shape of a Cosmos SDK `TxResponse`: a transaction hash,
//! its block height and timestamp, the messages it carried and the per-message
//! logs emitted while executing them. They are storage-agnostic and produced
//! by a [`crate::ports::TxSource`] adapter.

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

// =============================================================================
// Messages
// =============================================================================

/// A transaction message before it is decoded by a handler.
///
/// `value` is the JSON body of the message, including its `@type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Protobuf type URL (e.g. `/cosmwasm.wasm.v1.MsgStoreCode`).
    pub type_url: String,
    /// Message body as JSON.
    pub value: serde_json::Value,
}

impl RawMessage {
    /// Build a raw message from a JSON body carrying an `@type` field.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        let type_url = value.get("@type")?.as_str()?.to_string();
        Some(Self { type_url, value })
    }
}

// =============================================================================
// Events & Logs
// =============================================================================

/// A key/value pair inside an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// A typed, ordered list of attributes emitted during message execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl StringEvent {
    /// First attribute value with the given key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

/// Events emitted by a single message of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLog {
    /// Index of the message that emitted these events.
    #[serde(default)]
    pub msg_index: usize,
    #[serde(default)]
    pub events: Vec<StringEvent>,
}

// =============================================================================
// Transactions
// =============================================================================

/// A transaction included in a block, with its execution logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    /// Transaction hash (hex, upper case as reported by the node).
    pub hash: String,
    /// Block height.
    pub height: u64,
    /// Block time as reported by the node (RFC 3339).
    pub timestamp: String,
    /// Result code; 0 is success.
    #[serde(default)]
    pub code: u32,
    /// Messages in their original order.
    pub messages: Vec<RawMessage>,
    /// One log per successfully executed message. Empty when the tx failed.
    #[serde(default)]
    pub logs: Vec<TxLog>,
}

impl Tx {
    /// Whether execution emitted at least one event.
    pub fn has_events(&self) -> bool {
        self.logs.iter().any(|log| !log.events.is_empty())
    }

    /// Find the first event of `event_type` emitted by the message at `index`.
    pub fn find_event_by_type(
        &self,
        index: usize,
        event_type: &str,
    ) -> Result<&StringEvent, LookupError> {
        self.logs
            .iter()
            .find(|log| log.msg_index == index)
            .and_then(|log| log.events.iter().find(|ev| ev.event_type == event_type))
            .ok_or_else(|| LookupError::EventNotFound {
                event_type: event_type.to_string(),
                msg_index: index,
                tx_hash: self.hash.clone(),
            })
    }

    /// Find the value of the first attribute with `key` inside `event`.
    pub fn find_attribute_by_key<'a>(
        &self,
        event: &'a StringEvent,
        key: &str,
    ) -> Result<&'a str, LookupError> {
        event.attribute(key).ok_or_else(|| LookupError::AttributeNotFound {
            key: key.to_string(),
            event_type: event.event_type.clone(),
            tx_hash: self.hash.clone(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, attrs: &[(&str, &str)]) -> StringEvent {
        StringEvent {
            event_type: event_type.into(),
            attributes: attrs
                .iter()
                .map(|(k, v)| Attribute {
                    key: (*k).into(),
                    value: (*v).into(),
                })
                .collect(),
        }
    }

    fn tx(logs: Vec<TxLog>) -> Tx {
        Tx {
            hash: "DEADBEEF".into(),
            height: 100,
            timestamp: "2024-01-01T00:00:00Z".into(),
            code: 0,
            messages: vec![],
            logs,
        }
    }

    #[test]
    fn find_event_scoped_to_message_index() {
        let tx = tx(vec![
            TxLog {
                msg_index: 0,
                events: vec![event("store_code", &[("code_id", "1")])],
            },
            TxLog {
                msg_index: 1,
                events: vec![event("store_code", &[("code_id", "2")])],
            },
        ]);

        let ev = tx.find_event_by_type(1, "store_code").unwrap();
        assert_eq!(ev.attribute("code_id"), Some("2"));
    }

    #[test]
    fn find_event_returns_first_match() {
        let tx = tx(vec![TxLog {
            msg_index: 0,
            events: vec![
                event("message", &[]),
                event("execute", &[("result", "Zmlyc3Q=")]),
                event("execute", &[("result", "c2Vjb25k")]),
            ],
        }]);

        let ev = tx.find_event_by_type(0, "execute").unwrap();
        assert_eq!(tx.find_attribute_by_key(ev, "result").unwrap(), "Zmlyc3Q=");
    }

    #[test]
    fn find_event_missing_is_lookup_error() {
        let tx = tx(vec![TxLog {
            msg_index: 0,
            events: vec![event("message", &[])],
        }]);

        let err = tx.find_event_by_type(0, "instantiate").unwrap_err();
        assert_eq!(
            err,
            LookupError::EventNotFound {
                event_type: "instantiate".into(),
                msg_index: 0,
                tx_hash: "DEADBEEF".into(),
            }
        );

        // Pas de log pour cet index: même erreur
        assert!(tx.find_event_by_type(3, "message").is_err());
    }

    #[test]
    fn find_attribute_missing_is_lookup_error() {
        let tx = tx(vec![]);
        let ev = event("instantiate", &[("_contract_address", "wasm1abc")]);

        let err = tx.find_attribute_by_key(&ev, "result").unwrap_err();
        assert!(matches!(err, LookupError::AttributeNotFound { ref key, .. } if key == "result"));
    }

    // Test critique: un attribut vide n'est pas un attribut absent
    #[test]
    fn empty_attribute_value_is_found() {
        let tx = tx(vec![]);
        let ev = event("execute", &[("result", "")]);
        assert_eq!(tx.find_attribute_by_key(&ev, "result").unwrap(), "");
    }

    #[test]
    fn has_events_ignores_empty_logs() {
        assert!(!tx(vec![]).has_events());
        assert!(
            !tx(vec![TxLog {
                msg_index: 0,
                events: vec![]
            }])
            .has_events()
        );
        assert!(
            tx(vec![TxLog {
                msg_index: 0,
                events: vec![event("message", &[])]
            }])
            .has_events()
        );
    }

    #[test]
    fn raw_message_from_json() {
        let msg = RawMessage::from_json(json!({
            "@type": "/cosmwasm.wasm.v1.MsgClearAdmin",
            "sender": "wasm1sender",
            "contract": "wasm1contract"
        }))
        .unwrap();
        assert_eq!(msg.type_url, "/cosmwasm.wasm.v1.MsgClearAdmin");

        assert!(RawMessage::from_json(json!({"sender": "x"})).is_none());
    }

    #[test]
    fn log_deserializes_from_node_json() {
        let log: TxLog = serde_json::from_value(json!({
            "msg_index": 0,
            "log": "",
            "events": [{"type": "store_code", "attributes": [{"key": "code_id", "value": "42"}]}]
        }))
        .unwrap();
        assert_eq!(log.events[0].attribute("code_id"), Some("42"));
    }
}
