//! Browser-side mailbox (client_messages table)

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde_json::Value;

use crate::clock::to_db_timestamp;
use crate::db::{json_column, Database, DbResult};
use crate::models::{ClientMessage, ClientMessageBody};

/// Append a message for `session_id` on an existing connection or transaction.
pub(crate) fn insert_client_message(
    conn: &Connection,
    session_id: i64,
    body: &ClientMessageBody,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let data = serde_json::to_string(body)?;
    conn.execute(
        "INSERT INTO client_messages (session_id, kind, data, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![session_id, body.kind().as_ref(), data, to_db_timestamp(now)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Queue the wallet's current network and accounts for a session, in that order.
pub(crate) fn insert_initial_state(
    conn: &Connection,
    session_id: i64,
    rpc: &Value,
    accounts: &[String],
    now: DateTime<Utc>,
) -> DbResult<()> {
    insert_client_message(
        conn,
        session_id,
        &ClientMessageBody::Network {
            network_rpc: rpc.clone(),
        },
        now,
    )?;
    insert_client_message(
        conn,
        session_id,
        &ClientMessageBody::Accounts {
            accounts: accounts.to_vec(),
        },
        now,
    )?;
    Ok(())
}

impl Database {
    pub fn push_client_message(
        &self,
        session_id: i64,
        body: &ClientMessageBody,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        let conn = self.conn()?;
        insert_client_message(&conn, session_id, body, now)
    }

    /// Read messages after `cursor` in id order. With `purge`, messages at or
    /// below the cursor are deleted first, in the same transaction.
    pub fn poll_client_messages(
        &self,
        session_id: i64,
        cursor: Option<i64>,
        purge: bool,
    ) -> DbResult<Vec<ClientMessage>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let (Some(last_id), true) = (cursor, purge) {
            let purged = tx.execute(
                "DELETE FROM client_messages WHERE session_id = ?1 AND id <= ?2",
                rusqlite::params![session_id, last_id],
            )?;
            if purged > 0 {
                log::debug!("Purged {} client messages for session {}", purged, session_id);
            }
        }

        let messages = {
            let mut stmt = tx.prepare(
                "SELECT id, data FROM client_messages
                 WHERE session_id = ?1 AND (?2 IS NULL OR id > ?2)
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(rusqlite::params![session_id, cursor], |row| {
                Ok(ClientMessage {
                    id: row.get(0)?,
                    body: json_column(row, 1)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        tx.commit()?;
        Ok(messages)
    }

    #[cfg(test)]
    pub fn count_client_messages(&self, session_id: i64) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM client_messages WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
