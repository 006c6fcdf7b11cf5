//! Wallet-facing link ids.
//!
//! A link id is an HMAC-SHA256 of the record id keyed by the client token,
//! hex encoded and cut to [`LINK_ID_LEN`] characters. Without the client token
//! the raw record id cannot be recovered or enumerated.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const LINK_ID_LEN: usize = 16;

pub fn link_id(record_id: i64, client_token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(client_token.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(record_id.to_string().as_bytes());
    let mut id = hex::encode(mac.finalize().into_bytes());
    id.truncate(LINK_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_for_same_inputs() {
        assert_eq!(link_id(42, "client-a"), link_id(42, "client-a"));
        assert_eq!(link_id(42, "client-a").len(), LINK_ID_LEN);
    }

    #[test]
    fn test_salted_by_client_token() {
        assert_ne!(link_id(42, "client-a"), link_id(42, "client-b"));
    }

    #[test]
    fn test_differs_by_record() {
        assert_ne!(link_id(1, "client-a"), link_id(2, "client-a"));
    }

    #[test]
    fn test_does_not_contain_raw_id() {
        let id = link_id(123456789, "");
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, "123456789");
    }
}
