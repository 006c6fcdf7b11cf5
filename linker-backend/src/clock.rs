//! Time source for code expiry and link timestamps.
//!
//! Everything that compares against "now" goes through a [`Clock`] so expiry can
//! be exercised without sleeping.

use chrono::{DateTime, SecondsFormat, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock (UTC)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Milliseconds since the unix epoch, the format browsers and wallets exchange.
pub fn to_js_timestamp(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Fixed-width storage format (`2026-01-01T00:00:00.000Z`); lexical order == time order.
pub fn to_db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use chrono::Duration;
    use std::sync::Mutex;

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(start) }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_db_timestamp_is_fixed_width_and_ordered() {
        let early = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let late = early + Duration::milliseconds(1500);
        let a = to_db_timestamp(early);
        let b = to_db_timestamp(late);
        assert_eq!(a, "2026-01-01T09:00:00.000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_js_timestamp_is_millis() {
        let at = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 2).unwrap();
        assert_eq!(to_js_timestamp(at), 2000);
    }
}
