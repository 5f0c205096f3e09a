// Application configuration loaded from the environment

use std::str::FromStr;

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::auth::{PasswordParams, TokenService};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ")]
    SharedSecret,
}

/// Token secrets and lifetimes
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Marks the refresh cookie `Secure`
    pub secure_cookies: bool,
    pub password: PasswordParams,
}

/// Per-IP limit on login and signup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_second: u64,
    pub burst: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
    /// `None` when either setting is 0
    pub rate_limit: Option<RateLimitConfig>,
}

impl AppConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = required(&lookup, "DATABASE_URL")?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parsed(&lookup, "PORT", 8080u16)?;

        let access_secret = required(&lookup, "ACCESS_TOKEN_SECRET")?;
        let refresh_secret = required(&lookup, "REFRESH_TOKEN_SECRET")?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let access_token_ttl = ttl(&lookup, "ACCESS_TOKEN_TTL_SECS", TokenService::DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_token_ttl = ttl(&lookup, "REFRESH_TOKEN_TTL_SECS", TokenService::DEFAULT_REFRESH_TTL_SECS)?;

        let defaults = PasswordParams::default();
        let password = PasswordParams {
            memory_kib: parsed(&lookup, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parsed(&lookup, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parsed(&lookup, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        let secure_cookies = lookup("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let per_second = parsed(&lookup, "AUTH_RATE_LIMIT_PER_SECOND", 2u64)?;
        let burst = parsed(&lookup, "AUTH_RATE_LIMIT_BURST", 5u32)?;
        let rate_limit = (per_second > 0 && burst > 0).then_some(RateLimitConfig { per_second, burst });

        Ok(Self {
            database_url,
            host,
            port,
            auth: AuthConfig {
                access_secret,
                refresh_secret,
                access_token_ttl,
                refresh_token_ttl,
                secure_cookies,
                password,
            },
            rate_limit,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or(ConfigError::Missing(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(value)
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Lifetime in whole seconds, positive and small enough to add to the current time
fn ttl<F>(lookup: &F, name: &'static str, default: i64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parsed(lookup, name, default)?;
    let invalid = || ConfigError::Invalid {
        name,
        value: secs.to_string(),
    };

    if secs <= 0 {
        return Err(invalid());
    }
    let ttl = Duration::try_seconds(secs).ok_or_else(invalid)?;
    Utc::now().checked_add_signed(ttl).ok_or_else(invalid)?;
    Ok(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgresql://localhost/inkwell"),
        ("ACCESS_TOKEN_SECRET", "access-secret"),
        ("REFRESH_TOKEN_SECRET", "refresh-secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&BASE)).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.auth.access_token_ttl, Duration::seconds(900));
        assert_eq!(config.auth.refresh_token_ttl, Duration::days(7));
        assert_eq!(config.auth.password, PasswordParams::default());
        assert!(!config.auth.secure_cookies);
        assert_eq!(config.rate_limit, Some(RateLimitConfig { per_second: 2, burst: 5 }));
    }

    #[test]
    fn test_missing_and_empty_secrets() {
        let missing = AppConfig::from_lookup(lookup_from(&BASE[..2]));
        assert_eq!(missing.unwrap_err(), ConfigError::Missing("REFRESH_TOKEN_SECRET"));

        let mut vars = BASE.to_vec();
        vars[1] = ("ACCESS_TOKEN_SECRET", "  ");
        let empty = AppConfig::from_lookup(lookup_from(&vars));
        assert_eq!(empty.unwrap_err(), ConfigError::Empty("ACCESS_TOKEN_SECRET"));
    }

    #[test]
    fn test_secrets_must_differ() {
        let mut vars = BASE.to_vec();
        vars[2] = ("REFRESH_TOKEN_SECRET", "access-secret");

        let result = AppConfig::from_lookup(lookup_from(&vars));
        assert_eq!(result.unwrap_err(), ConfigError::SharedSecret);
    }

    #[test]
    fn test_overrides() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("PORT", "3000"),
            ("APP_ENV", "production"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("ARGON2_MEMORY_KIB", "65536"),
            ("AUTH_RATE_LIMIT_PER_SECOND", "0"),
        ]);

        let config = AppConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.port, 3000);
        assert!(config.auth.secure_cookies);
        assert_eq!(config.auth.access_token_ttl, Duration::seconds(60));
        assert_eq!(config.auth.password.memory_kib, 65536);
        assert_eq!(config.rate_limit, None);
    }

    #[test]
    fn test_invalid_numbers() {
        let mut vars = BASE.to_vec();
        vars.push(("PORT", "eighty"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&vars)),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));

        let mut vars = BASE.to_vec();
        vars.push(("REFRESH_TOKEN_TTL_SECS", "-1"));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&vars)),
            Err(ConfigError::Invalid { name: "REFRESH_TOKEN_TTL_SECS", .. })
        ));
    }

    #[test]
    fn test_oversized_ttl_is_rejected() {
        let max = i64::MAX.to_string();
        for (name, value) in [
            ("REFRESH_TOKEN_TTL_SECS", max.as_str()),
            ("ACCESS_TOKEN_TTL_SECS", "9223372036854775"),
        ] {
            let mut vars = BASE.to_vec();
            vars.push((name, value));

            match AppConfig::from_lookup(lookup_from(&vars)) {
                Err(ConfigError::Invalid { name: field, .. }) => assert_eq!(field, name),
                other => panic!("Expected Invalid for {}, got {:?}", name, other),
            }
        }
    }
}
