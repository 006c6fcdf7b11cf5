//! Request and response shapes for the pairing operations

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AppInfo, ClientMessage, NewCall, PendingCall};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub client_token: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub pending_call: Option<NewCall>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub force_relink: bool,
}

/// Result of `request_code`. `code` is empty once linked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeGrant {
    pub client_token: String,
    pub session_token: String,
    pub code: String,
    pub linked: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientPollRequest {
    #[serde(default)]
    pub client_token: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub last_message_id: Option<i64>,
}

/// Result of a browser poll. An empty `client_token` tells the browser to start over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientPoll {
    pub client_token: String,
    pub session_token: Option<String>,
    pub messages: Vec<ClientMessage>,
    pub linked: bool,
}

impl ClientPoll {
    pub fn reset() -> Self {
        Self {
            client_token: String::new(),
            session_token: None,
            messages: Vec::new(),
            linked: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkRequest {
    pub wallet_token: String,
    pub code: String,
    #[serde(default)]
    pub current_rpc: Value,
    #[serde(default)]
    pub current_accounts: Vec<String>,
}

/// What the wallet learns when a link completes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkGrant {
    pub return_url: Option<String>,
    pub pending_call: Option<PendingCall>,
    pub app_info: Option<AppInfo>,
    pub link_id: String,
    pub linked_at: i64,
}

/// Read-only preview of an outstanding code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodePreview {
    pub return_url: Option<String>,
    pub app_info: Option<AppInfo>,
    pub link_id: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallSubmission {
    pub client_token: Option<String>,
    pub session_token: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    pub call_id: String,
    pub call: Value,
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletPollRequest {
    pub wallet_token: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub last_message_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallResult {
    pub wallet_token: String,
    pub call_id: String,
    pub session_token: String,
    pub result: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientUnlinkRequest {
    pub client_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletUnlinkRequest {
    pub wallet_token: String,
    pub link_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletLinksRequest {
    pub wallet_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointRegistration {
    pub wallet_token: String,
    pub eth_address: String,
    pub endpoint: String,
}
