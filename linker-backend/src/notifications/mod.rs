//! Wallet wake-up notifications
//!
//! When a call lands in a wallet mailbox the wallet app may be asleep. A
//! notification dispatcher pokes it through whatever push gateway the
//! deployment runs:
//!
//! - `LINKER_NOTIFY_URL` set: [`HttpNotificationDispatcher`] posts JSON to it
//! - unset: [`LogNotificationDispatcher`] only logs (development)

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::Serialize;
use serde_json::Value;

use crate::models::{NotificationEndpoint, NotificationKind};

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_to_wallet(
        &self,
        endpoint: &NotificationEndpoint,
        kind: NotificationKind,
        payload: Value,
    ) -> Result<(), String>;

    /// Name for logging
    fn name(&self) -> &'static str;
}

/// Body posted to the push gateway
#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    endpoint: &'a str,
    eth_address: &'a str,
    device_token: &'a str,
    #[serde(rename = "type")]
    kind: NotificationKind,
    data: Value,
}

pub struct HttpNotificationDispatcher {
    gateway_url: String,
    http_client: reqwest::Client,
}

impl HttpNotificationDispatcher {
    pub fn new(gateway_url: &str) -> Result<Self, String> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn send_to_wallet(
        &self,
        endpoint: &NotificationEndpoint,
        kind: NotificationKind,
        payload: Value,
    ) -> Result<(), String> {
        let body = PushRequest {
            endpoint: &endpoint.endpoint,
            eth_address: &endpoint.eth_address,
            device_token: &endpoint.device_token,
            kind,
            data: payload,
        };

        let response = self
            .http_client
            .post(&self.gateway_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Push gateway request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("Push gateway error ({}): {}", status, text));
        }

        log::debug!("[NOTIFY] {} sent to {}", kind, endpoint.eth_address);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Debug, Default)]
pub struct LogNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LogNotificationDispatcher {
    async fn send_to_wallet(
        &self,
        endpoint: &NotificationEndpoint,
        kind: NotificationKind,
        payload: Value,
    ) -> Result<(), String> {
        log::info!(
            "[NOTIFY] {} for {} ({}): {}",
            kind,
            endpoint.eth_address,
            endpoint.endpoint,
            payload
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Pick a dispatcher for the configured gateway. Falls back to logging if the
/// HTTP client cannot be built.
pub fn create_notification_dispatcher(gateway_url: Option<&str>) -> Arc<dyn NotificationDispatcher> {
    match gateway_url {
        Some(url) if !url.is_empty() => match HttpNotificationDispatcher::new(url) {
            Ok(dispatcher) => {
                log::info!("[NOTIFY] Sending wallet notifications to {}", url);
                Arc::new(dispatcher)
            }
            Err(e) => {
                log::error!("[NOTIFY] {}; notifications will only be logged", e);
                Arc::new(LogNotificationDispatcher)
            }
        },
        _ => {
            log::info!("[NOTIFY] No push gateway configured, notifications will only be logged");
            Arc::new(LogNotificationDispatcher)
        }
    }
}

/// EIP-55 form of `raw`, or `None` if it is not a 20-byte hex address
pub fn checksum_address(raw: &str) -> Option<String> {
    raw.trim().parse::<Address>().ok().map(|address| to_checksum(&address, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_checksum_address() {
        assert_eq!(
            checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").as_deref(),
            Some("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
        );
        assert!(checksum_address("not-an-address").is_none());
        assert!(checksum_address("0x1234").is_none());
    }

    #[test]
    fn test_push_request_shape() {
        let body = PushRequest {
            endpoint: "arn:push/1",
            eth_address: "0xabc",
            device_token: "wallet",
            kind: NotificationKind::InfoTransactionPending,
            data: json!("Send 1 ETH"),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "endpoint": "arn:push/1",
                "eth_address": "0xabc",
                "device_token": "wallet",
                "type": "INFO_TRANSACTION_PENDING",
                "data": "Send 1 ETH"
            })
        );
    }

    #[test]
    fn test_factory_falls_back_to_logging() {
        assert_eq!(create_notification_dispatcher(None).name(), "log");
        assert_eq!(create_notification_dispatcher(Some("")).name(), "log");
        assert_eq!(
            create_notification_dispatcher(Some("http://localhost:9000/push")).name(),
            "http"
        );
    }

    #[tokio::test]
    async fn test_log_dispatcher_never_fails() {
        let endpoint = NotificationEndpoint {
            id: 1,
            eth_address: "0xabc".to_string(),
            device_token: "wallet".to_string(),
            endpoint: "arn:push/1".to_string(),
            active: true,
            updated_at: Utc::now(),
        };
        LogNotificationDispatcher
            .send_to_wallet(&endpoint, NotificationKind::TransactionPending, json!({}))
            .await
            .unwrap();
    }
}
