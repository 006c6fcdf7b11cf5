//! Database methods for notification_endpoints table

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use crate::clock::to_db_timestamp;
use crate::db::{timestamp_column, Database, DbResult};
use crate::models::NotificationEndpoint;

impl Database {
    fn row_to_notification_endpoint(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationEndpoint> {
        Ok(NotificationEndpoint {
            id: row.get(0)?,
            eth_address: row.get(1)?,
            device_token: row.get(2)?,
            endpoint: row.get(3)?,
            active: row.get::<_, i32>(4)? != 0,
            updated_at: timestamp_column(row, 5)?,
        })
    }

    /// Register (or re-activate) the push endpoint for an address/device pair.
    pub fn upsert_notification_endpoint(
        &self,
        eth_address: &str,
        device_token: &str,
        endpoint: &str,
        now: DateTime<Utc>,
    ) -> DbResult<NotificationEndpoint> {
        let conn = self.conn()?;
        let now_str = to_db_timestamp(now);
        conn.execute(
            "INSERT INTO notification_endpoints (eth_address, device_token, endpoint, active, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)
             ON CONFLICT(eth_address, device_token) DO UPDATE SET
                endpoint = excluded.endpoint,
                active = 1,
                updated_at = excluded.updated_at",
            rusqlite::params![eth_address, device_token, endpoint, &now_str],
        )?;

        let stored = conn.query_row(
            "SELECT id, eth_address, device_token, endpoint, active, updated_at
             FROM notification_endpoints WHERE eth_address = ?1 AND device_token = ?2",
            rusqlite::params![eth_address, device_token],
            Self::row_to_notification_endpoint,
        )?;
        Ok(stored)
    }

    pub fn get_active_notification_endpoint(
        &self,
        eth_address: &str,
        device_token: &str,
    ) -> DbResult<Option<NotificationEndpoint>> {
        let conn = self.conn()?;
        let endpoint = conn
            .query_row(
                "SELECT id, eth_address, device_token, endpoint, active, updated_at
                 FROM notification_endpoints
                 WHERE eth_address = ?1 AND device_token = ?2 AND active = 1",
                rusqlite::params![eth_address, device_token],
                Self::row_to_notification_endpoint,
            )
            .optional()?;
        Ok(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_endpoint() {
        let db = Database::new(":memory:").unwrap();
        let now = Utc::now();
        let first = db
            .upsert_notification_endpoint("0xAbC", "device", "https://push/a", now)
            .unwrap();
        let second = db
            .upsert_notification_endpoint("0xAbC", "device", "https://push/b", now)
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.endpoint, "https://push/b");

        let active = db.get_active_notification_endpoint("0xAbC", "device").unwrap().unwrap();
        assert_eq!(active.endpoint, "https://push/b");
        assert!(db.get_active_notification_endpoint("0xAbC", "other").unwrap().is_none());
    }
}
