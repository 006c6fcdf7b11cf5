use chrono::{DateTime, Utc};

/// A browser tab bound to a pairing record. Many may share one record.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedSession {
    pub id: i64,
    pub session_token: String,
    pub pairing_record_id: i64,
    pub created_at: DateTime<Utc>,
}
