//! Pairing record database operations (pairing_records table)
//!
//! Code uniqueness is enforced by the partial UNIQUE index on `code`; linking
//! consumes the code with a guarded update so it can only succeed once.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior};
use serde_json::Value;

use super::client_messages::insert_initial_state;
use crate::clock::to_db_timestamp;
use crate::db::{
    is_unique_violation, opt_json_column, opt_timestamp_column, timestamp_column, Database,
    DbResult,
};
use crate::models::{PairingRecord, PendingCall, RawAppInfo};

const RECORD_COLUMNS: &str = "id, client_token, code, code_expires, linked, wallet_token, \
     current_rpc, current_accounts, pending_call, app_info, return_url, linked_at, created_at";

/// Outcome of trying to store a freshly drawn code on a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeClaim {
    Claimed,
    /// Another active record already holds this value
    Taken,
    /// The record was linked (or vanished) in the meantime
    NotClaimable,
}

/// Result of consuming a code
#[derive(Debug, Clone)]
pub struct CompletedLink {
    /// Record state after the link
    pub record: PairingRecord,
    /// The call that was waiting on the record, now cleared from it
    pub pending_call: Option<PendingCall>,
    /// Sessions that received NETWORK/ACCOUNTS messages
    pub sessions_notified: usize,
}

impl Database {
    fn row_to_pairing_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<PairingRecord> {
        Ok(PairingRecord {
            id: row.get(0)?,
            client_token: row.get(1)?,
            code: row.get(2)?,
            code_expires: opt_timestamp_column(row, 3)?,
            linked: row.get::<_, i32>(4)? != 0,
            wallet_token: row.get(5)?,
            current_rpc: opt_json_column(row, 6)?,
            current_accounts: opt_json_column(row, 7)?,
            pending_call: opt_json_column(row, 8)?,
            app_info: opt_json_column(row, 9)?,
            return_url: row.get(10)?,
            linked_at: opt_timestamp_column(row, 11)?,
            created_at: timestamp_column(row, 12)?,
        })
    }

    pub fn create_pairing_record(&self, client_token: &str, now: DateTime<Utc>) -> DbResult<PairingRecord> {
        let conn = self.conn()?;
        let now_str = to_db_timestamp(now);
        conn.execute(
            "INSERT INTO pairing_records (client_token, linked, created_at, updated_at)
             VALUES (?1, 0, ?2, ?2)",
            rusqlite::params![client_token, &now_str],
        )?;
        let id = conn.last_insert_rowid();

        Ok(PairingRecord {
            id,
            client_token: client_token.to_string(),
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
        })
    }

    pub fn get_pairing_record(&self, id: i64) -> DbResult<Option<PairingRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM pairing_records WHERE id = ?1", RECORD_COLUMNS),
                [id],
                Self::row_to_pairing_record,
            )
            .optional()?;
        Ok(record)
    }

    pub fn get_pairing_record_by_client_token(&self, client_token: &str) -> DbResult<Option<PairingRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM pairing_records WHERE client_token = ?1", RECORD_COLUMNS),
                [client_token],
                Self::row_to_pairing_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Find the record holding `code`, if that code has not expired
    pub fn get_pairing_record_by_active_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<PairingRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM pairing_records WHERE code = ?1 AND code_expires > ?2",
                    RECORD_COLUMNS
                ),
                rusqlite::params![code, to_db_timestamp(now)],
                Self::row_to_pairing_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Drop any wallet binding so the record can be re-paired
    pub fn force_unlink_pairing_record(&self, id: i64, now: DateTime<Utc>) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE pairing_records SET linked = 0, wallet_token = NULL, updated_at = ?1 WHERE id = ?2",
            rusqlite::params![to_db_timestamp(now), id],
        )?;
        Ok(())
    }

    /// Record where to send the browser back to, and (when given) its app info
    pub fn update_pairing_request(
        &self,
        id: i64,
        app_info: Option<&RawAppInfo>,
        return_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let conn = self.conn()?;
        let now_str = to_db_timestamp(now);
        match app_info {
            Some(info) => {
                let app_info_json = serde_json::to_string(info)?;
                conn.execute(
                    "UPDATE pairing_records SET app_info = ?1, return_url = ?2, updated_at = ?3 WHERE id = ?4",
                    rusqlite::params![app_info_json, return_url, &now_str, id],
                )?;
            }
            None => {
                conn.execute(
                    "UPDATE pairing_records SET return_url = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![return_url, &now_str, id],
                )?;
            }
        }
        Ok(())
    }

    /// Store `code` on an unlinked record. Expired holders of the same value are
    /// retired first; an active holder makes the claim fail with `Taken`.
    pub fn claim_pairing_code(
        &self,
        id: i64,
        code: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DbResult<CodeClaim> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now_str = to_db_timestamp(now);

        tx.execute(
            "UPDATE pairing_records SET code = NULL, code_expires = NULL, updated_at = ?3
             WHERE code = ?1 AND code_expires <= ?2 AND id != ?4",
            rusqlite::params![code, &now_str, &now_str, id],
        )?;

        let updated = tx.execute(
            "UPDATE pairing_records SET code = ?1, code_expires = ?2, updated_at = ?3
             WHERE id = ?4 AND linked = 0",
            rusqlite::params![code, to_db_timestamp(expires_at), &now_str, id],
        );

        match updated {
            Ok(0) => Ok(CodeClaim::NotClaimable),
            Ok(_) => {
                tx.commit()?;
                Ok(CodeClaim::Claimed)
            }
            Err(e) if is_unique_violation(&e) => Ok(CodeClaim::Taken),
            Err(e) => Err(e.into()),
        }
    }

    /// Park a call on an unlinked record. Returns false if it is linked by now.
    pub fn set_pending_call(&self, id: i64, call: &PendingCall, now: DateTime<Utc>) -> DbResult<bool> {
        let conn = self.conn()?;
        let call_json = serde_json::to_string(call)?;
        let updated = conn.execute(
            "UPDATE pairing_records SET pending_call = ?1, updated_at = ?2 WHERE id = ?3 AND linked = 0",
            rusqlite::params![call_json, to_db_timestamp(now), id],
        )?;
        Ok(updated > 0)
    }

    /// Consume an unexpired code and bind the record to `wallet_token`.
    ///
    /// Runs as one transaction: the code is cleared with a guarded update, the
    /// pending call is taken off the record, and every session already bound to
    /// the record gets the wallet's network and accounts. Returns `None` (with
    /// nothing written) for unknown, expired or already-consumed codes.
    pub fn complete_pairing_link(
        &self,
        code: &str,
        wallet_token: &str,
        rpc: &Value,
        accounts: &[String],
        now: DateTime<Utc>,
    ) -> DbResult<Option<CompletedLink>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now_str = to_db_timestamp(now);

        let record = tx
            .query_row(
                &format!(
                    "SELECT {} FROM pairing_records WHERE code = ?1 AND code_expires > ?2",
                    RECORD_COLUMNS
                ),
                rusqlite::params![code, &now_str],
                Self::row_to_pairing_record,
            )
            .optional()?;

        let Some(mut record) = record else {
            return Ok(None);
        };

        let updated = tx.execute(
            "UPDATE pairing_records SET
                code = NULL, code_expires = NULL, linked = 1, wallet_token = ?1,
                current_rpc = ?2, current_accounts = ?3, linked_at = ?4,
                pending_call = NULL, updated_at = ?4
             WHERE id = ?5 AND code = ?6",
            rusqlite::params![
                wallet_token,
                serde_json::to_string(rpc)?,
                serde_json::to_string(accounts)?,
                &now_str,
                record.id,
                code
            ],
        )?;
        if updated != 1 {
            return Ok(None);
        }

        let session_ids = {
            let mut stmt =
                tx.prepare("SELECT id FROM linked_sessions WHERE pairing_record_id = ?1 ORDER BY id")?;
            let rows = stmt.query_map([record.id], |row| row.get::<_, i64>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        for session_id in &session_ids {
            insert_initial_state(&tx, *session_id, rpc, accounts, now)?;
        }

        tx.commit()?;

        let pending_call = record.pending_call.take();
        record.code = None;
        record.code_expires = None;
        record.linked = true;
        record.wallet_token = Some(wallet_token.to_string());
        record.current_rpc = Some(rpc.clone());
        record.current_accounts = Some(accounts.to_vec());
        record.linked_at = Some(now);

        Ok(Some(CompletedLink {
            record,
            pending_call,
            sessions_notified: session_ids.len(),
        }))
    }

    /// Client-initiated unlink. Keeps the wallet token for history.
    /// Returns whether anything changed.
    pub fn unlink_pairing_record(&self, client_token: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE pairing_records SET linked = 0, updated_at = ?1 WHERE client_token = ?2 AND linked = 1",
            rusqlite::params![to_db_timestamp(now), client_token],
        )?;
        Ok(updated > 0)
    }

    /// Wallet-initiated unlink: also clears the wallet binding
    pub fn release_wallet_link(&self, id: i64, wallet_token: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE pairing_records SET linked = 0, wallet_token = NULL, updated_at = ?1
             WHERE id = ?2 AND wallet_token = ?3 AND linked = 1",
            rusqlite::params![to_db_timestamp(now), id, wallet_token],
        )?;
        Ok(updated > 0)
    }

    /// All records currently linked to `wallet_token`
    pub fn list_linked_pairing_records(&self, wallet_token: &str) -> DbResult<Vec<PairingRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pairing_records WHERE wallet_token = ?1 AND linked = 1 ORDER BY id",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map([wallet_token], Self::row_to_pairing_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
