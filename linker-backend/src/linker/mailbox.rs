//! Per-owner, cursor-consumed message logs.
//!
//! Both sides follow the same contract: `enqueue` appends with a strictly
//! increasing id, `poll` optionally purges everything at or below the cursor
//! and returns what is left above it in id order. Purge and read happen in one
//! transaction, so a single poll never loses a message enqueued concurrently.
//! Delivery across pollers is still at-least-once per cursor value: two tabs
//! polling with the same cursor may both see the same messages, so consumers
//! de-duplicate by message id / `call_id`.

use std::sync::Arc;

use super::LinkerResult;
use crate::clock::Clock;
use crate::db::Database;
use crate::models::{ClientMessage, ClientMessageBody, LinkedSession, WalletMessage, WalletMessageBody};

pub trait Mailbox {
    type Owner;
    type Body;
    type Message;

    fn enqueue(&self, owner: &Self::Owner, body: &Self::Body) -> LinkerResult<i64>;

    fn poll(&self, owner: &Self::Owner, cursor: Option<i64>, purge: bool) -> LinkerResult<Vec<Self::Message>>;
}

/// Browser-side mailbox, keyed by session
pub struct ClientMailbox {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl ClientMailbox {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

impl Mailbox for ClientMailbox {
    type Owner = LinkedSession;
    type Body = ClientMessageBody;
    type Message = ClientMessage;

    fn enqueue(&self, owner: &LinkedSession, body: &ClientMessageBody) -> LinkerResult<i64> {
        Ok(self.db.push_client_message(owner.id, body, self.clock.now())?)
    }

    fn poll(&self, owner: &LinkedSession, cursor: Option<i64>, purge: bool) -> LinkerResult<Vec<ClientMessage>> {
        Ok(self.db.poll_client_messages(owner.id, cursor, purge)?)
    }
}

/// A wallet token plus the accounts the caller is acting for. Messages are
/// only delivered to pollers whose first account was in the enqueue-time
/// snapshot, so a wallet that switched accounts does not act on stale calls.
#[derive(Debug, Clone)]
pub struct WalletOwner {
    pub wallet_token: String,
    pub accounts: Vec<String>,
}

/// Wallet-side mailbox, keyed by wallet token
pub struct WalletMailbox {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl WalletMailbox {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

impl Mailbox for WalletMailbox {
    type Owner = WalletOwner;
    type Body = WalletMessageBody;
    type Message = WalletMessage;

    fn enqueue(&self, owner: &WalletOwner, body: &WalletMessageBody) -> LinkerResult<i64> {
        Ok(self
            .db
            .push_wallet_message(&owner.wallet_token, &owner.accounts, body, self.clock.now())?)
    }

    fn poll(&self, owner: &WalletOwner, cursor: Option<i64>, purge: bool) -> LinkerResult<Vec<WalletMessage>> {
        let Some(account) = owner.accounts.first() else {
            return Ok(Vec::new());
        };
        Ok(self
            .db
            .poll_wallet_messages(&owner.wallet_token, account, cursor, purge)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::models::{CallMeta, CallRequest};
    use chrono::Utc;
    use serde_json::json;

    fn mailboxes() -> (Arc<Database>, ClientMailbox, WalletMailbox) {
        let db = Arc::new(Database::new(":memory:").unwrap());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        (
            db.clone(),
            ClientMailbox::new(db.clone(), clock.clone()),
            WalletMailbox::new(db, clock),
        )
    }

    #[test]
    fn test_client_mailbox_round_trip_by_cursor() {
        let (db, client, _) = mailboxes();
        let record = db.create_pairing_record("client", Utc::now()).unwrap();
        let session = db.create_linked_session(&record, Utc::now()).unwrap();

        let first = client
            .enqueue(&session, &ClientMessageBody::CallResponse { call_id: "a".into(), result: json!(1) })
            .unwrap();
        let second = client
            .enqueue(&session, &ClientMessageBody::CallResponse { call_id: "b".into(), result: json!(2) })
            .unwrap();
        assert!(second > first);

        let after_first = client.poll(&session, Some(first), true).unwrap();
        assert_eq!(after_first.len(), 1);
        assert_eq!(after_first[0].id, second);
        // First message is gone for good
        assert_eq!(client.poll(&session, None, false).unwrap().len(), 1);
    }

    #[test]
    fn test_wallet_poll_without_accounts_is_empty() {
        let (_, _, wallet) = mailboxes();
        let owner = WalletOwner {
            wallet_token: "wallet".to_string(),
            accounts: vec!["0xaaa".to_string()],
        };
        wallet
            .enqueue(
                &owner,
                &WalletMessageBody::Call(CallRequest {
                    call_id: "c".into(),
                    call: json!([]),
                    meta: CallMeta::default(),
                    session_token: None,
                    return_url: None,
                }),
            )
            .unwrap();

        let no_accounts = WalletOwner {
            wallet_token: "wallet".to_string(),
            accounts: Vec::new(),
        };
        assert!(wallet.poll(&no_accounts, None, true).unwrap().is_empty());
        assert_eq!(wallet.poll(&owner, None, true).unwrap().len(), 1);
    }
}
