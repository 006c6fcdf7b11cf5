//! Database model modules - extends Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table group.

pub mod client_messages;        // client_messages (browser mailbox)
mod linked_sessions;            // linked_sessions
mod notification_endpoints;     // notification_endpoints (wallet push targets)
pub mod pairing_records;        // pairing_records (codes, links, pending calls)
mod wallet_messages;            // wallet_messages (wallet mailbox)
