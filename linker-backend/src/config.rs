use std::env;

use crate::linker::LinkerConfig;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const DB_POOL_SIZE: &str = "DB_POOL_SIZE";
    // Pairing code issuance
    pub const CODE_LENGTH: &str = "LINKER_CODE_LENGTH";
    pub const CODE_TTL_MINUTES: &str = "LINKER_CODE_TTL_MINUTES";
    pub const CODE_MAX_ATTEMPTS: &str = "LINKER_CODE_MAX_ATTEMPTS";
    // Push gateway for wallet wake-ups (unset = log only)
    pub const NOTIFY_URL: &str = "LINKER_NOTIFY_URL";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8080;
    pub const DATABASE_URL: &str = "./.db/linker.db";
    pub const DB_POOL_SIZE: u32 = 8;
    pub const CODE_LENGTH: usize = 9;
    pub const CODE_TTL_MINUTES: i64 = 60;
    pub const MIN_CODE_TTL_MINUTES: i64 = 1;
    pub const MAX_CODE_TTL_MINUTES: i64 = 7 * 24 * 60;
    pub const CODE_MAX_ATTEMPTS: usize = 10;
}

/// Parse an env var, falling back to the default when unset or malformed
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Clamp a parsed value into `[min, max]`, warning when it had to move
fn clamp_env<T: PartialOrd + std::fmt::Debug>(name: &str, value: T, min: T, max: T) -> T {
    let clamped = if value < min {
        min
    } else if value > max {
        max
    } else {
        return value;
    };
    log::warn!("{} = {:?} is out of range, using {:?}", name, value, clamped);
    clamped
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_pool_size: u32,
    pub code_length: usize,
    pub code_ttl_minutes: i64,
    pub code_max_attempts: usize,
    pub notify_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parse_env(env_vars::PORT, defaults::PORT),
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            db_pool_size: parse_env(env_vars::DB_POOL_SIZE, defaults::DB_POOL_SIZE).max(1),
            code_length: parse_env(env_vars::CODE_LENGTH, defaults::CODE_LENGTH).max(1),
            code_ttl_minutes: clamp_env(
                env_vars::CODE_TTL_MINUTES,
                parse_env(env_vars::CODE_TTL_MINUTES, defaults::CODE_TTL_MINUTES),
                defaults::MIN_CODE_TTL_MINUTES,
                defaults::MAX_CODE_TTL_MINUTES,
            ),
            code_max_attempts: parse_env(env_vars::CODE_MAX_ATTEMPTS, defaults::CODE_MAX_ATTEMPTS)
                .max(1),
            notify_url: env::var(env_vars::NOTIFY_URL)
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }

    /// Pairing-code settings for the linker service
    pub fn linker(&self) -> LinkerConfig {
        LinkerConfig {
            code_length: self.code_length,
            code_ttl_minutes: self.code_ttl_minutes,
            code_max_attempts: self.code_max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        std::env::set_var("LINKER_TEST_GARBAGE_PORT", "not-a-port");
        assert_eq!(parse_env("LINKER_TEST_GARBAGE_PORT", 8080u16), 8080);
        std::env::remove_var("LINKER_TEST_GARBAGE_PORT");
    }

    #[test]
    fn test_parse_env_reads_value() {
        std::env::set_var("LINKER_TEST_TTL", " 15 ");
        assert_eq!(parse_env("LINKER_TEST_TTL", 60i64), 15);
        std::env::remove_var("LINKER_TEST_TTL");
    }

    #[test]
    fn test_code_ttl_is_clamped() {
        std::env::set_var(env_vars::CODE_TTL_MINUTES, "0");
        assert_eq!(Config::from_env().code_ttl_minutes, defaults::MIN_CODE_TTL_MINUTES);
        std::env::set_var(env_vars::CODE_TTL_MINUTES, i64::MAX.to_string());
        assert_eq!(Config::from_env().code_ttl_minutes, defaults::MAX_CODE_TTL_MINUTES);
        std::env::set_var(env_vars::CODE_TTL_MINUTES, "15");
        assert_eq!(Config::from_env().code_ttl_minutes, 15);
        std::env::remove_var(env_vars::CODE_TTL_MINUTES);
    }

    #[test]
    fn test_clamp_env_bounds() {
        assert_eq!(clamp_env("LINKER_TEST_CLAMP", -5i64, 1, 10), 1);
        assert_eq!(clamp_env("LINKER_TEST_CLAMP", 50i64, 1, 10), 10);
        assert_eq!(clamp_env("LINKER_TEST_CLAMP", 7i64, 1, 10), 7);
    }

    #[test]
    fn test_linker_settings_follow_config() {
        let config = Config {
            port: defaults::PORT,
            database_url: defaults::DATABASE_URL.to_string(),
            db_pool_size: defaults::DB_POOL_SIZE,
            code_length: 12,
            code_ttl_minutes: 5,
            code_max_attempts: 3,
            notify_url: None,
        };
        let linker = config.linker();
        assert_eq!(linker.code_length, 12);
        assert_eq!(linker.code_ttl_minutes, 5);
        assert_eq!(linker.code_max_attempts, 3);
    }
}
