//! Pairing orchestration: the operations the browser and the wallet call.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use super::link_hash::link_id;
use super::mailbox::{ClientMailbox, Mailbox, WalletMailbox, WalletOwner};
use super::{user_agent, CodeGenerator, LinkerConfig, LinkerError, LinkerResult, Outcome};
use crate::clock::{to_js_timestamp, Clock};
use crate::db::{is_unique_violation, Database, DbError};
use crate::dissector::{call_meta, TransactionDissector};
use crate::models::{
    AppInfo, CallMeta, CallRequest, CallResult, CallSubmission, ClientMessageBody, ClientPoll,
    CodeGrant, CodePreview, CodeRequest, EndpointRegistration, LinkGrant, LinkSummary,
    LinkedSession, NotificationEndpoint, NotificationKind, PairingRecord, PairingState, PendingCall,
    RawAppInfo, WalletMessage, WalletMessageBody,
};
use crate::notifications::{checksum_address, NotificationDispatcher};

pub struct LinkerService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    codes: CodeGenerator,
    client_mailbox: ClientMailbox,
    wallet_mailbox: WalletMailbox,
    dissector: Arc<dyn TransactionDissector>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl LinkerService {
    pub fn new(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        config: LinkerConfig,
        dissector: Arc<dyn TransactionDissector>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            client_mailbox: ClientMailbox::new(db.clone(), clock.clone()),
            wallet_mailbox: WalletMailbox::new(db.clone(), clock.clone()),
            codes: CodeGenerator::new(&config),
            db,
            clock,
            dissector,
            notifier,
        }
    }

    /// Start (or resume) pairing for a browser.
    ///
    /// Unlinked records get a fresh code every time; linked records are left
    /// alone unless `force_relink` is set. A pending call is only parked on a
    /// record that is still unlinked.
    pub fn request_code(&self, request: CodeRequest) -> LinkerResult<CodeGrant> {
        let now = self.clock.now();
        let client_token = request
            .client_token
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut record = self.find_or_create_record(&client_token)?;

        if request.force_relink && (record.linked || record.wallet_token.is_some()) {
            self.db.force_unlink_pairing_record(record.id, now)?;
            record.linked = false;
            record.wallet_token = None;
            log::info!("[LINKER] Record {} forced back to pairing", record.id);
        }

        let state = record.state(now);
        if state != PairingState::Linked {
            log::debug!("[LINKER] Record {} is {}, issuing a code", record.id, state);
            let app_info = request.user_agent.as_ref().map(|agent| RawAppInfo {
                user_agent: Some(agent.clone()),
            });
            self.db
                .update_pairing_request(record.id, app_info.as_ref(), request.return_url.as_deref(), now)?;

            let expires_at = self.codes.expiry_from(now);
            let record_id = record.id;
            let issued = self
                .codes
                .issue(|candidate| Ok(self.db.claim_pairing_code(record_id, candidate, expires_at, now)?))?;

            match issued {
                Some(code) => {
                    log::info!("[LINKER] Issued pairing code for record {}", record.id);
                    record.code = Some(code);
                    record.code_expires = Some(expires_at);
                }
                None => {
                    // Linked between our read and the claim
                    if let Some(fresh) = self.db.get_pairing_record(record.id)? {
                        record = fresh;
                    }
                }
            }
        }

        let session = self.resume_session(&record, request.session_token.as_deref())?;

        if let Some(call) = request.pending_call {
            if !record.linked {
                let pending = PendingCall {
                    meta: call_meta(self.dissector.as_ref(), None, &call.call),
                    call_id: call.call_id,
                    call: call.call,
                    session_token: Some(session.session_token.clone()),
                };
                if self.db.set_pending_call(record.id, &pending, now)? {
                    log::debug!("[LINKER] Parked call {} on record {}", pending.call_id, record.id);
                } else {
                    log::warn!(
                        "[LINKER] Record {} linked before call {} could be parked",
                        record.id,
                        pending.call_id
                    );
                }
            }
        }

        Ok(CodeGrant {
            client_token,
            session_token: session.session_token,
            code: if record.linked {
                String::new()
            } else {
                record.code.unwrap_or_default()
            },
            linked: record.linked,
        })
    }

    /// Mint a new session for `record`, seeded with the current network and
    /// accounts if the record is linked. The session is read back before it is
    /// handed out.
    pub fn ensure_session(&self, record: &PairingRecord) -> LinkerResult<LinkedSession> {
        let created = self.db.create_linked_session(record, self.clock.now())?;
        match self.db.get_linked_session(&created.session_token, record.id)? {
            Some(session) => Ok(session),
            None => {
                log::error!(
                    "[LINKER] Session {} vanished right after creation",
                    created.id
                );
                Err(LinkerError::SessionRegeneration)
            }
        }
    }

    /// Browser poll: linkage status plus any messages past `cursor`.
    ///
    /// Unknown client tokens reset the browser. A missing or stale session
    /// token on a linked record is replaced by a fresh session.
    pub fn poll_client_messages(
        &self,
        client_token: Option<&str>,
        session_token: Option<&str>,
        cursor: Option<i64>,
    ) -> LinkerResult<ClientPoll> {
        let Some(client_token) = client_token.filter(|token| !token.is_empty()) else {
            return Ok(ClientPoll::reset());
        };
        let Some(record) = self.db.get_pairing_record_by_client_token(client_token)? else {
            return Ok(ClientPoll::reset());
        };

        if !record.linked {
            return Ok(ClientPoll {
                client_token: client_token.to_string(),
                session_token: session_token.map(str::to_string),
                messages: Vec::new(),
                linked: false,
            });
        }

        let session = self.resume_session(&record, session_token)?;
        let messages = self.client_mailbox.poll(&session, cursor, true)?;

        Ok(ClientPoll {
            client_token: client_token.to_string(),
            session_token: Some(session.session_token),
            messages,
            linked: true,
        })
    }

    /// Redeem a pairing code for `wallet_token`. Unknown, expired or already
    /// used codes are `NotReady` and change nothing.
    pub fn complete_link(
        &self,
        wallet_token: &str,
        code: &str,
        current_rpc: &Value,
        current_accounts: &[String],
    ) -> LinkerResult<Outcome<LinkGrant>> {
        let now = self.clock.now();
        let Some(done) = self
            .db
            .complete_pairing_link(code, wallet_token, current_rpc, current_accounts, now)?
        else {
            log::info!("[LINKER] Link attempt with an unknown or expired code");
            return Ok(Outcome::NotReady);
        };

        log::info!(
            "[LINKER] Record {} linked, {} session(s) notified{}",
            done.record.id,
            done.sessions_notified,
            if done.pending_call.is_some() { ", pending call handed over" } else { "" }
        );

        Ok(Outcome::Ready(LinkGrant {
            return_url: done.record.return_url.clone(),
            app_info: app_info_of(&done.record),
            link_id: link_id(done.record.id, &done.record.client_token),
            linked_at: to_js_timestamp(now),
            pending_call: done.pending_call,
        }))
    }

    /// Preview an outstanding code without consuming it
    pub fn query_code(&self, code: &str) -> LinkerResult<Outcome<CodePreview>> {
        let Some(record) = self
            .db
            .get_pairing_record_by_active_code(code, self.clock.now())?
            .filter(|record| !record.linked)
        else {
            return Ok(Outcome::NotReady);
        };
        let Some(expires) = record.code_expires else {
            return Ok(Outcome::NotReady);
        };

        Ok(Outcome::Ready(CodePreview {
            return_url: record.return_url.clone(),
            app_info: app_info_of(&record),
            link_id: link_id(record.id, &record.client_token),
            expires_at: to_js_timestamp(expires),
        }))
    }

    /// Queue a browser call for the linked wallet and wake the wallet up.
    /// Returns false (queuing nothing) if the client is not linked or the
    /// session does not belong to it.
    pub async fn submit_call(&self, submission: CallSubmission) -> LinkerResult<bool> {
        let Some(client_token) = submission.client_token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(false);
        };
        let Some(record) = self
            .db
            .get_pairing_record_by_client_token(client_token)?
            .filter(|record| record.linked)
        else {
            return Ok(false);
        };
        let Some(wallet_token) = record.wallet_token.clone() else {
            return Ok(false);
        };
        let Some(session) = self.db.get_linked_session(&submission.session_token, record.id)? else {
            log::warn!(
                "[LINKER] Call {} rejected: session is not bound to record {}",
                submission.call_id,
                record.id
            );
            return Ok(false);
        };

        let meta = call_meta(self.dissector.as_ref(), record.current_rpc.as_ref(), &submission.call);
        let owner = WalletOwner {
            wallet_token,
            accounts: submission.accounts,
        };
        let body = WalletMessageBody::Call(CallRequest {
            call_id: submission.call_id.clone(),
            call: submission.call,
            meta: meta.clone(),
            session_token: Some(session.session_token),
            return_url: submission.return_url.filter(|url| !url.is_empty()),
        });
        let message_id = self.wallet_mailbox.enqueue(&owner, &body)?;
        log::info!(
            "[LINKER] Call {} queued for wallet as message {}",
            submission.call_id,
            message_id
        );

        self.notify_wallet(&owner, &meta).await;
        Ok(true)
    }

    /// Best effort: a missing endpoint or a failed push never fails the call
    async fn notify_wallet(&self, owner: &WalletOwner, meta: &CallMeta) {
        let Some(address) = owner.accounts.first().and_then(|account| checksum_address(account)) else {
            log::debug!("[NOTIFY] No valid account to notify for this call");
            return;
        };

        let endpoint = match self
            .db
            .get_active_notification_endpoint(&address, &owner.wallet_token)
        {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                log::debug!("[NOTIFY] No notification endpoint registered for {}", address);
                return;
            }
            Err(e) => {
                log::warn!("[NOTIFY] Endpoint lookup failed for {}: {}", address, e);
                return;
            }
        };

        let (kind, payload) = match &meta.info {
            Some(info) => (NotificationKind::InfoTransactionPending, info.clone()),
            None => (NotificationKind::TransactionPending, json!({})),
        };

        if let Err(e) = self.notifier.send_to_wallet(&endpoint, kind, payload).await {
            log::warn!(
                "[NOTIFY] {} notification via {} failed: {}",
                kind,
                self.notifier.name(),
                e
            );
        }
    }

    /// Wallet poll. Only messages queued while `accounts[0]` was among the
    /// browser's accounts are returned.
    pub fn poll_wallet_messages(
        &self,
        wallet_token: &str,
        accounts: &[String],
        cursor: Option<i64>,
    ) -> LinkerResult<Vec<WalletMessage>> {
        if wallet_token.is_empty() {
            return Ok(Vec::new());
        }
        let owner = WalletOwner {
            wallet_token: wallet_token.to_string(),
            accounts: accounts.to_vec(),
        };
        self.wallet_mailbox.poll(&owner, cursor, true)
    }

    /// Hand a call result back to the browser session that made the call.
    /// Every failure here is an integrity violation.
    pub fn deliver_result(&self, result: CallResult) -> LinkerResult<()> {
        let Some(session) = self.db.get_linked_session_by_token(&result.session_token)? else {
            log::error!("[LINKER] Result for call {} names an unknown session", result.call_id);
            return Err(LinkerError::SessionNotFound);
        };
        let Some(record) = self
            .db
            .get_pairing_record(session.pairing_record_id)?
            .filter(|record| record.linked)
        else {
            log::error!(
                "[LINKER] Result for call {} targets an unlinked session",
                result.call_id
            );
            return Err(LinkerError::SessionNotLinked);
        };
        if record.wallet_token.as_deref() != Some(result.wallet_token.as_str()) {
            log::error!(
                "[LINKER] Result for call {} came from a wallet not linked to record {}",
                result.call_id,
                record.id
            );
            return Err(LinkerError::WalletMismatch);
        }

        let message_id = self.client_mailbox.enqueue(
            &session,
            &ClientMessageBody::CallResponse {
                call_id: result.call_id.clone(),
                result: result.result,
            },
        )?;
        log::info!(
            "[LINKER] Result for call {} delivered as message {}",
            result.call_id,
            message_id
        );
        Ok(())
    }

    /// Client-side unlink. Always succeeds; unlinking twice is a no-op.
    pub fn unlink(&self, client_token: &str) -> LinkerResult<bool> {
        if self.db.unlink_pairing_record(client_token, self.clock.now())? {
            log::info!("[LINKER] Client unlinked");
        }
        Ok(true)
    }

    /// Wallet-side unlink by external link id. Returns whether a link matched.
    pub fn unlink_by_wallet(&self, wallet_token: &str, external_link_id: &str) -> LinkerResult<bool> {
        if wallet_token.is_empty() {
            return Ok(false);
        }
        let matched = self
            .db
            .list_linked_pairing_records(wallet_token)?
            .into_iter()
            .find(|record| link_id(record.id, &record.client_token) == external_link_id);

        let Some(record) = matched else {
            return Ok(false);
        };
        let released = self
            .db
            .release_wallet_link(record.id, wallet_token, self.clock.now())?;
        if released {
            log::info!("[LINKER] Wallet released record {}", record.id);
        }
        Ok(released)
    }

    pub fn list_links(&self, wallet_token: &str) -> LinkerResult<Vec<LinkSummary>> {
        if wallet_token.is_empty() {
            return Ok(Vec::new());
        }
        let links = self
            .db
            .list_linked_pairing_records(wallet_token)?
            .iter()
            .map(|record| LinkSummary {
                linked: record.linked,
                app_info: app_info_of(record),
                link_id: link_id(record.id, &record.client_token),
                linked_at: record.linked_at.map(to_js_timestamp),
            })
            .collect();
        Ok(links)
    }

    /// Register where to push notifications for `eth_address` on this wallet.
    /// An address that is not a valid hex address is `NotReady`.
    pub fn register_notification_endpoint(
        &self,
        registration: EndpointRegistration,
    ) -> LinkerResult<Outcome<NotificationEndpoint>> {
        let Some(address) = checksum_address(&registration.eth_address) else {
            return Ok(Outcome::NotReady);
        };
        if registration.wallet_token.is_empty() || registration.endpoint.is_empty() {
            return Ok(Outcome::NotReady);
        }
        let endpoint = self.db.upsert_notification_endpoint(
            &address,
            &registration.wallet_token,
            &registration.endpoint,
            self.clock.now(),
        )?;
        log::info!("[NOTIFY] Registered notification endpoint for {}", address);
        Ok(Outcome::Ready(endpoint))
    }

    fn find_or_create_record(&self, client_token: &str) -> LinkerResult<PairingRecord> {
        if let Some(record) = self.db.get_pairing_record_by_client_token(client_token)? {
            return Ok(record);
        }
        match self.db.create_pairing_record(client_token, self.clock.now()) {
            Ok(record) => {
                log::info!("[LINKER] New pairing record {}", record.id);
                Ok(record)
            }
            // Another request created it first
            Err(DbError::Sqlite(e)) if is_unique_violation(&e) => self
                .db
                .get_pairing_record_by_client_token(client_token)?
                .ok_or(LinkerError::Storage(DbError::Sqlite(e))),
            Err(e) => Err(e.into()),
        }
    }

    /// Reuse `session_token` if it belongs to `record`, otherwise mint a new one
    fn resume_session(&self, record: &PairingRecord, session_token: Option<&str>) -> LinkerResult<LinkedSession> {
        if let Some(token) = session_token.filter(|token| !token.is_empty()) {
            if let Some(session) = self.db.get_linked_session(token, record.id)? {
                return Ok(session);
            }
            log::debug!("[LINKER] Stale session for record {}, issuing a new one", record.id);
        }
        self.ensure_session(record)
    }
}

fn app_info_of(record: &PairingRecord) -> Option<AppInfo> {
    record
        .app_info
        .as_ref()
        .and_then(|raw| raw.user_agent.as_deref())
        .map(user_agent::parse)
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
