//! Pairing code issuance.
//!
//! Codes are short alphanumeric strings a person can type. Uniqueness among
//! active codes is decided by storage (the claim callback); the generator only
//! draws candidates and gives up after a bounded number of collisions.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::{LinkerConfig, LinkerError, LinkerResult};
use crate::config::defaults;
use crate::db::CodeClaim;

#[derive(Debug, Clone)]
pub struct CodeGenerator {
    length: usize,
    ttl: Duration,
    max_attempts: usize,
}

impl CodeGenerator {
    pub fn new(config: &LinkerConfig) -> Self {
        Self {
            length: config.code_length,
            ttl: Duration::minutes(
                config
                    .code_ttl_minutes
                    .clamp(defaults::MIN_CODE_TTL_MINUTES, defaults::MAX_CODE_TTL_MINUTES),
            ),
            max_attempts: config.code_max_attempts.max(1),
        }
    }

    /// One uniformly random candidate (`[A-Za-z0-9]{length}`)
    pub fn draw(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }

    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl
    }

    /// Draw candidates until `claim` stores one.
    ///
    /// Returns `Ok(None)` if the record stopped accepting codes (it was linked
    /// in the meantime). Running out of attempts is fatal.
    pub fn issue<F>(&self, mut claim: F) -> LinkerResult<Option<String>>
    where
        F: FnMut(&str) -> LinkerResult<CodeClaim>,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = self.draw();
            match claim(&candidate)? {
                CodeClaim::Claimed => return Ok(Some(candidate)),
                CodeClaim::NotClaimable => return Ok(None),
                CodeClaim::Taken => {
                    log::warn!("[LINKER] Pairing code collision (attempt {})", attempt);
                }
            }
        }

        log::error!(
            "[LINKER] Gave up issuing a pairing code after {} attempts",
            self.max_attempts
        );
        Err(LinkerError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> CodeGenerator {
        CodeGenerator::new(&LinkerConfig::default())
    }

    #[test]
    fn test_draw_shape() {
        let code = generator().draw();
        assert_eq!(code.len(), 9);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_expiry_is_ttl_after_now() {
        let now = Utc::now();
        assert_eq!(generator().expiry_from(now), now + Duration::minutes(60));
    }

    #[test]
    fn test_out_of_range_ttl_is_bounded() {
        let now = Utc::now();
        let huge = CodeGenerator::new(&LinkerConfig {
            code_ttl_minutes: i64::MAX,
            ..LinkerConfig::default()
        });
        assert_eq!(
            huge.expiry_from(now),
            now + Duration::minutes(defaults::MAX_CODE_TTL_MINUTES)
        );

        let negative = CodeGenerator::new(&LinkerConfig {
            code_ttl_minutes: -30,
            ..LinkerConfig::default()
        });
        assert!(negative.expiry_from(now) > now);
    }

    #[test]
    fn test_retries_past_collisions() {
        let mut calls = 0;
        let code = generator()
            .issue(|_| {
                calls += 1;
                Ok(if calls < 3 { CodeClaim::Taken } else { CodeClaim::Claimed })
            })
            .unwrap();
        assert!(code.is_some());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhaustion_is_fatal() {
        let mut calls = 0;
        let err = generator()
            .issue(|_| {
                calls += 1;
                Ok(CodeClaim::Taken)
            })
            .unwrap_err();
        assert!(matches!(err, LinkerError::CodeSpaceExhausted { attempts: 10 }));
        assert_eq!(calls, 10);
    }

    #[test]
    fn test_not_claimable_stops_early() {
        let result = generator().issue(|_| Ok(CodeClaim::NotClaimable)).unwrap();
        assert!(result.is_none());
    }
}
