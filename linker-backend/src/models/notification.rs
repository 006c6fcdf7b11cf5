use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where to wake a wallet device (keyed by checksummed address + device token)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEndpoint {
    pub id: i64,
    pub eth_address: String,
    pub device_token: String,
    pub endpoint: String,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A call is waiting and the dissector described it
    InfoTransactionPending,
    /// A call is waiting, no description available
    TransactionPending,
}
