//! Mailbox message types.
//!
//! Each kind is a variant carrying exactly its own fields. The serialized form is
//! flat: `{"id": 7, "type": "CALL_RESPONSE", "call_id": "...", "result": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CallMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Network,
    Accounts,
    CallResponse,
    Call,
}

/// Messages addressed to a browser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessageBody {
    Network { network_rpc: Value },
    Accounts { accounts: Vec<String> },
    CallResponse { call_id: String, result: Value },
}

impl ClientMessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            ClientMessageBody::Network { .. } => MessageKind::Network,
            ClientMessageBody::Accounts { .. } => MessageKind::Accounts,
            ClientMessageBody::CallResponse { .. } => MessageKind::CallResponse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub id: i64,
    #[serde(flatten)]
    pub body: ClientMessageBody,
}

/// A call the wallet should act on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub call_id: String,
    pub call: Value,
    #[serde(default)]
    pub meta: CallMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

/// Messages addressed to a wallet token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletMessageBody {
    Call(CallRequest),
}

impl WalletMessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            WalletMessageBody::Call(_) => MessageKind::Call,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletMessage {
    pub id: i64,
    #[serde(flatten)]
    pub body: WalletMessageBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_client_message_serializes_flat() {
        let msg = ClientMessage {
            id: 3,
            body: ClientMessageBody::CallResponse {
                call_id: "c2".to_string(),
                result: json!({"hash": "0x01"}),
            },
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"id": 3, "type": "CALL_RESPONSE", "call_id": "c2", "result": {"hash": "0x01"}})
        );
    }

    #[test]
    fn test_wallet_call_omits_absent_optionals() {
        let msg = WalletMessage {
            id: 9,
            body: WalletMessageBody::Call(CallRequest {
                call_id: "c1".to_string(),
                call: json!(["eth_sendTransaction", {}]),
                meta: CallMeta::default(),
                session_token: Some("s1".to_string()),
                return_url: None,
            }),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "CALL");
        assert_eq!(value["call_id"], "c1");
        assert_eq!(value["session_token"], "s1");
        assert!(value.get("return_url").is_none());
        assert_eq!(value["meta"], json!({}));
    }

    #[test]
    fn test_kind_names_match_wire_tags() {
        let body = ClientMessageBody::Accounts { accounts: vec![] };
        assert_eq!(body.kind().as_ref(), "ACCOUNTS");
        assert_eq!(MessageKind::CallResponse.to_string(), "CALL_RESPONSE");
        assert_eq!(MessageKind::from_str("NETWORK").unwrap(), MessageKind::Network);
    }
}
