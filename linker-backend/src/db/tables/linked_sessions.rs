//! Browser session database operations

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior};
use serde_json::Value;
use uuid::Uuid;

use super::client_messages::insert_initial_state;
use crate::clock::to_db_timestamp;
use crate::db::{timestamp_column, Database, DbResult};
use crate::models::{LinkedSession, PairingRecord};

impl Database {
    fn row_to_linked_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkedSession> {
        Ok(LinkedSession {
            id: row.get(0)?,
            session_token: row.get(1)?,
            pairing_record_id: row.get(2)?,
            created_at: timestamp_column(row, 3)?,
        })
    }

    /// Always creates a new session. If the record is linked, the session is
    /// seeded with the current network and accounts in the same transaction.
    pub fn create_linked_session(
        &self,
        record: &PairingRecord,
        now: DateTime<Utc>,
    ) -> DbResult<LinkedSession> {
        let session_token = Uuid::new_v4().to_string();
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO linked_sessions (session_token, pairing_record_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![&session_token, record.id, to_db_timestamp(now)],
        )?;
        let id = tx.last_insert_rowid();

        if record.linked {
            let rpc = record.current_rpc.clone().unwrap_or(Value::Null);
            let accounts = record.current_accounts.clone().unwrap_or_default();
            insert_initial_state(&tx, id, &rpc, &accounts, now)?;
        }

        tx.commit()?;

        Ok(LinkedSession {
            id,
            session_token,
            pairing_record_id: record.id,
            created_at: now,
        })
    }

    /// Look up a session token, but only if it belongs to `pairing_record_id`
    pub fn get_linked_session(
        &self,
        session_token: &str,
        pairing_record_id: i64,
    ) -> DbResult<Option<LinkedSession>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT id, session_token, pairing_record_id, created_at
                 FROM linked_sessions WHERE session_token = ?1 AND pairing_record_id = ?2",
                rusqlite::params![session_token, pairing_record_id],
                Self::row_to_linked_session,
            )
            .optional()?;
        Ok(session)
    }

    pub fn get_linked_session_by_token(&self, session_token: &str) -> DbResult<Option<LinkedSession>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT id, session_token, pairing_record_id, created_at
                 FROM linked_sessions WHERE session_token = ?1",
                [session_token],
                Self::row_to_linked_session,
            )
            .optional()?;
        Ok(session)
    }

    #[cfg(test)]
    pub fn list_linked_sessions(&self, pairing_record_id: i64) -> DbResult<Vec<LinkedSession>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_token, pairing_record_id, created_at
             FROM linked_sessions WHERE pairing_record_id = ?1 ORDER BY id",
        )?;
        let sessions = stmt
            .query_map([pairing_record_id], Self::row_to_linked_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientMessageBody;
    use serde_json::json;

    #[test]
    fn test_unlinked_session_starts_empty() {
        let db = Database::new(":memory:").unwrap();
        let now = Utc::now();
        let record = db.create_pairing_record("client", now).unwrap();
        let session = db.create_linked_session(&record, now).unwrap();

        assert_eq!(session.pairing_record_id, record.id);
        assert_eq!(db.count_client_messages(session.id).unwrap(), 0);
    }

    #[test]
    fn test_linked_session_is_seeded() {
        let db = Database::new(":memory:").unwrap();
        let now = Utc::now();
        let mut record = db.create_pairing_record("client", now).unwrap();
        record.linked = true;
        record.current_rpc = Some(json!({"url": "https://rpc.example"}));
        record.current_accounts = Some(vec!["0xabc".to_string()]);

        let session = db.create_linked_session(&record, now).unwrap();
        let messages = db.poll_client_messages(session.id, None, false).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0].body, ClientMessageBody::Network { .. }));
        assert!(matches!(messages[1].body, ClientMessageBody::Accounts { .. }));
    }

    #[test]
    fn test_session_lookup_is_scoped_to_record() {
        let db = Database::new(":memory:").unwrap();
        let now = Utc::now();
        let a = db.create_pairing_record("client-a", now).unwrap();
        let b = db.create_pairing_record("client-b", now).unwrap();
        let session = db.create_linked_session(&a, now).unwrap();

        assert!(db.get_linked_session(&session.session_token, a.id).unwrap().is_some());
        assert!(db.get_linked_session(&session.session_token, b.id).unwrap().is_none());
        assert!(db.get_linked_session_by_token(&session.session_token).unwrap().is_some());
        assert!(db.get_linked_session_by_token("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_sessions_per_record_are_allowed() {
        let db = Database::new(":memory:").unwrap();
        let now = Utc::now();
        let record = db.create_pairing_record("client", now).unwrap();
        let first = db.create_linked_session(&record, now).unwrap();
        let second = db.create_linked_session(&record, now).unwrap();

        assert_ne!(first.session_token, second.session_token);
        assert_eq!(db.list_linked_sessions(record.id).unwrap().len(), 2);
    }
}
