use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client metadata captured when a code is issued (stored as-is)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAppInfo {
    #[serde(rename = "user-agent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Parsed client metadata shown to the wallet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    pub platform: Option<String>,
    pub browser: Option<String>,
    pub language: Option<String>,
    pub version: Option<String>,
}

/// Display metadata extracted from a call. `info` drives the notification kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl CallMeta {
    pub fn is_empty(&self) -> bool {
        self.info.is_none() && self.details.is_empty()
    }
}

/// A call as the browser submits it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCall {
    pub call_id: String,
    pub call: Value,
}

/// The single call a record may hold while it waits to be linked.
/// Handed to the wallet by `complete_link`, never through the mailbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCall {
    pub call_id: String,
    pub call: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default)]
    pub meta: CallMeta,
}

/// Lifecycle position of a pairing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PairingState {
    /// A code is outstanding and has not expired
    AwaitingLink,
    /// A code is present but past expiry; the next request reissues it
    Expired,
    /// Unlinked with no outstanding code (after an unlink)
    Idle,
    Linked,
}

/// Root entity: one per client token
#[derive(Debug, Clone, PartialEq)]
pub struct PairingRecord {
    pub id: i64,
    pub client_token: String,
    pub code: Option<String>,
    pub code_expires: Option<DateTime<Utc>>,
    pub linked: bool,
    pub wallet_token: Option<String>,
    pub current_rpc: Option<Value>,
    pub current_accounts: Option<Vec<String>>,
    pub pending_call: Option<PendingCall>,
    pub app_info: Option<RawAppInfo>,
    pub return_url: Option<String>,
    pub linked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PairingRecord {
    pub fn state(&self, now: DateTime<Utc>) -> PairingState {
        if self.linked {
            return PairingState::Linked;
        }
        match (&self.code, self.code_expires) {
            (Some(_), Some(expires)) if expires > now => PairingState::AwaitingLink,
            (Some(_), _) => PairingState::Expired,
            (None, _) => PairingState::Idle,
        }
    }
}

/// Wallet-facing view of a link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSummary {
    pub linked: bool,
    pub app_info: Option<AppInfo>,
    pub link_id: String,
    pub linked_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn record(now: DateTime<Utc>) -> PairingRecord {
        PairingRecord {
            id: 1,
            client_token: "client".to_string(),
            code: None,
            code_expires: None,
            linked: false,
            wallet_token: None,
            current_rpc: None,
            current_accounts: None,
            pending_call: None,
            app_info: None,
            return_url: None,
            linked_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_state_transitions_follow_code_and_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut rec = record(now);
        assert_eq!(rec.state(now), PairingState::Idle);

        rec.code = Some("abc".to_string());
        rec.code_expires = Some(now + Duration::minutes(60));
        assert_eq!(rec.state(now), PairingState::AwaitingLink);
        assert_eq!(rec.state(now + Duration::minutes(61)), PairingState::Expired);

        rec.code = None;
        rec.linked = true;
        assert_eq!(rec.state(now), PairingState::Linked);
    }

    #[test]
    fn test_call_meta_flattens_details() {
        let mut meta = CallMeta::default();
        assert!(meta.is_empty());
        meta.details.insert("to".to_string(), json!("0xabc"));
        meta.info = Some(json!("Send 1 ETH"));
        let encoded = serde_json::to_value(&meta).unwrap();
        assert_eq!(encoded, json!({"info": "Send 1 ETH", "to": "0xabc"}));
    }

    #[test]
    fn test_raw_app_info_uses_dashed_key() {
        let raw = RawAppInfo {
            user_agent: Some("Mozilla/5.0".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&raw).unwrap(),
            json!({"user-agent": "Mozilla/5.0"})
        );
    }
}
