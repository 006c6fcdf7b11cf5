//! Wallet-side mailbox (wallet_messages table)

use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;

use crate::clock::to_db_timestamp;
use crate::db::{json_column, Database, DbResult};
use crate::models::{WalletMessage, WalletMessageBody};

impl Database {
    /// Queue a message for `wallet_token`, tagged with the accounts the browser saw.
    pub fn push_wallet_message(
        &self,
        wallet_token: &str,
        accounts: &[String],
        body: &WalletMessageBody,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        let conn = self.conn()?;
        let accounts_json = serde_json::to_string(accounts)?;
        let data = serde_json::to_string(body)?;
        conn.execute(
            "INSERT INTO wallet_messages (wallet_token, current_accounts, kind, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                wallet_token,
                accounts_json,
                body.kind().as_ref(),
                data,
                to_db_timestamp(now)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Messages for `wallet_token` whose account snapshot contains `account`.
    /// With `purge`, anything at or below `cursor` is deleted first, in the
    /// same transaction.
    pub fn poll_wallet_messages(
        &self,
        wallet_token: &str,
        account: &str,
        cursor: Option<i64>,
        purge: bool,
    ) -> DbResult<Vec<WalletMessage>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let (Some(last_id), true) = (cursor, purge) {
            let purged = tx.execute(
                "DELETE FROM wallet_messages
                 WHERE wallet_token = ?1 AND id <= ?3
                   AND EXISTS (SELECT 1 FROM json_each(wallet_messages.current_accounts)
                               WHERE json_each.value = ?2)",
                rusqlite::params![wallet_token, account, last_id],
            )?;
            if purged > 0 {
                log::debug!("Purged {} wallet messages", purged);
            }
        }

        let messages = {
            let mut stmt = tx.prepare(
                "SELECT id, data FROM wallet_messages
                 WHERE wallet_token = ?1
                   AND EXISTS (SELECT 1 FROM json_each(wallet_messages.current_accounts)
                               WHERE json_each.value = ?2)
                   AND (?3 IS NULL OR id > ?3)
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(rusqlite::params![wallet_token, account, cursor], |row| {
                Ok(WalletMessage {
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
    pub fn count_wallet_messages(&self, wallet_token: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM wallet_messages WHERE wallet_token = ?1",
            [wallet_token],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
