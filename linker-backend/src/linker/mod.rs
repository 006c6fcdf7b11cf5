//! Pairing between a browser dapp and a mobile wallet.
//!
//! The browser asks for a short code, the wallet redeems it, and from then on
//! the two exchange work through a pair of polled mailboxes:
//!
//! - **Client mailbox**: per browser session; network/account updates and call results
//! - **Wallet mailbox**: per wallet token; calls waiting for the wallet to act
//!
//! Soft failures ("not linked yet", "unknown code") come back as values
//! ([`Outcome::NotReady`], `false`). Integrity violations come back as
//! [`LinkerError`].

pub mod code;
pub mod error;
pub mod link_hash;
pub mod mailbox;
pub mod service;
pub mod user_agent;

pub use code::CodeGenerator;
pub use error::{LinkerError, LinkerResult, Outcome};
pub use service::LinkerService;

use crate::config::defaults;

/// Pairing code settings
#[derive(Debug, Clone)]
pub struct LinkerConfig {
    pub code_length: usize,
    pub code_ttl_minutes: i64,
    pub code_max_attempts: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            code_length: defaults::CODE_LENGTH,
            code_ttl_minutes: defaults::CODE_TTL_MINUTES,
            code_max_attempts: defaults::CODE_MAX_ATTEMPTS,
        }
    }
}
