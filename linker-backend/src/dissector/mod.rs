//! Transaction dissection
//!
//! Pulls display metadata out of a raw `eth_sendTransaction`-style call so the
//! wallet (and its push notification) can describe it before the user opens
//! the app.

use serde_json::{Map, Value};

use crate::models::CallMeta;

/// Describes a transaction object. Implementations must not fail; an
/// unrecognizable transaction yields empty metadata.
pub trait TransactionDissector: Send + Sync {
    fn dissect(&self, rpc: Option<&Value>, txn: &Value) -> CallMeta;
}

/// Metadata for a whole call (`[method, {txn_object, ...}, ...]`).
/// Only calls whose second element carries a non-empty `txn_object` are dissected.
pub fn call_meta(dissector: &dyn TransactionDissector, rpc: Option<&Value>, call: &Value) -> CallMeta {
    match call.get(1).and_then(|params| params.get("txn_object")) {
        Some(txn) if !is_blank(txn) => dissector.dissect(rpc, txn),
        _ => CallMeta::default(),
    }
}

/// null, false, 0, "", [] and {}
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Copies the destination, value and 4-byte function selector.
/// Never produces `info`, so notifications stay generic.
#[derive(Debug, Default, Clone)]
pub struct BasicDissector;

impl TransactionDissector for BasicDissector {
    fn dissect(&self, _rpc: Option<&Value>, txn: &Value) -> CallMeta {
        let mut details = Map::new();

        if let Some(to) = txn.get("to").and_then(Value::as_str) {
            details.insert("to".to_string(), Value::String(to.to_string()));
        }
        if let Some(value) = txn.get("value").filter(|v| !v.is_null()) {
            details.insert("value".to_string(), value.clone());
        }

        let data = txn
            .get("data")
            .or_else(|| txn.get("input"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let data = data.strip_prefix("0x").unwrap_or(data);
        if let Some(selector) = data.get(..8).filter(|s| s.chars().all(|c| c.is_ascii_hexdigit())) {
            details.insert(
                "function_selector".to_string(),
                Value::String(format!("0x{}", selector.to_lowercase())),
            );
        }

        CallMeta { info: None, details }
    }
}
