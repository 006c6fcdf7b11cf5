use std::fmt;

use crate::db::DbError;

/// Hard failures. Anything here should reach the caller as an error, not an
/// empty result.
#[derive(Debug)]
pub enum LinkerError {
    Storage(DbError),
    /// No free code found after the configured number of draws
    CodeSpaceExhausted { attempts: usize },
    /// A session we just created could not be read back
    SessionRegeneration,
    SessionNotFound,
    SessionNotLinked,
    /// The session's record is linked to a different wallet than the caller
    WalletMismatch,
}

pub type LinkerResult<T> = Result<T, LinkerError>;

impl LinkerError {
    /// Forged or stale handshakes, as opposed to infrastructure failures
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            LinkerError::SessionNotFound | LinkerError::SessionNotLinked | LinkerError::WalletMismatch
        )
    }
}

impl fmt::Display for LinkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkerError::Storage(e) => write!(f, "Storage error: {}", e),
            LinkerError::CodeSpaceExhausted { attempts } => write!(
                f,
                "No unused pairing code found after {} attempts",
                attempts
            ),
            LinkerError::SessionRegeneration => write!(f, "Problem generating the session"),
            LinkerError::SessionNotFound => write!(f, "Session does not exist"),
            LinkerError::SessionNotLinked => write!(f, "Session not linked"),
            LinkerError::WalletMismatch => write!(f, "Wallet linked to a different session"),
        }
    }
}

impl std::error::Error for LinkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LinkerError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for LinkerError {
    fn from(e: DbError) -> Self {
        LinkerError::Storage(e)
    }
}

/// Result of a lookup that may legitimately find nothing yet
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ready(T),
    NotReady,
}

impl<T> Outcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            Outcome::NotReady => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_classification() {
        assert!(LinkerError::WalletMismatch.is_integrity_violation());
        assert!(LinkerError::SessionNotFound.is_integrity_violation());
        assert!(!LinkerError::CodeSpaceExhausted { attempts: 10 }.is_integrity_violation());
        assert!(!LinkerError::SessionRegeneration.is_integrity_violation());
    }

    #[test]
    fn test_outcome_ready() {
        assert_eq!(Outcome::Ready(3).ready(), Some(3));
        assert_eq!(Outcome::<i32>::NotReady.ready(), None);
    }
}
