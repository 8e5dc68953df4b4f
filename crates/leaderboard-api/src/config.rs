//! Server configuration read from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use leaderboard_core::concurrency::ConcurrencyMode;
use leaderboard_outbox::relay::RelayConfig;
use leaderboard_outbox::retry::RetryPolicy;

use crate::error::AppError;

/// Everything the binary needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `DATABASE_URL`, required.
    pub database_url: String,
    /// `HOST`, default `0.0.0.0`.
    pub host: String,
    /// `PORT`, default `3000`.
    pub port: u16,
    /// `DATABASE_MAX_CONNECTIONS`, default `10`.
    pub database_max_connections: u32,
    /// `OUTBOX_DISPATCH_INTERVAL_MS` and `OUTBOX_BATCH_SIZE`.
    pub relay: RelayConfig,
    /// `OUTBOX_RETRY_*`.
    pub retry: RetryPolicy,
    /// `TRANSPORT_BASE_URL`, required.
    pub transport_base_url: String,
    /// `TRANSPORT_TIMEOUT_MS`, default `5000`.
    pub transport_timeout: Duration,
    /// `ALLOW_UNVERSIONED_WRITES=true` selects [`ConcurrencyMode::Relaxed`].
    pub concurrency_mode: ConcurrencyMode,
    /// `OUTBOX_CLAIM_LEASE_MS`, default `300000`.
    pub outbox_claim_lease: Duration,
    /// `SHUTDOWN_GRACE_PERIOD_MS`, default `10000`. In-flight requests are
    /// cancelled once it has elapsed.
    pub shutdown_grace: Duration,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let dispatch_interval_ms: u64 = parse_or(&lookup, "OUTBOX_DISPATCH_INTERVAL_MS", 1000)?;
        if dispatch_interval_ms == 0 {
            return Err(AppError::Config(
                "OUTBOX_DISPATCH_INTERVAL_MS must be greater than zero".into(),
            ));
        }
        let batch_size: usize = parse_or(&lookup, "OUTBOX_BATCH_SIZE", 100)?;
        if batch_size == 0 {
            return Err(AppError::Config(
                "OUTBOX_BATCH_SIZE must be greater than zero".into(),
            ));
        }

        let retry = RetryPolicy::new(
            parse_or(&lookup, "OUTBOX_RETRY_MAX_ATTEMPTS", 3)?,
            Duration::from_millis(parse_or(&lookup, "OUTBOX_RETRY_BASE_DELAY_MS", 200)?),
            Duration::from_millis(parse_or(&lookup, "OUTBOX_RETRY_MAX_DELAY_MS", 7_200_000)?),
            parse_or(&lookup, "OUTBOX_RETRY_GROWTH_FACTOR", 2.0)?,
        )
        .map_err(|e| AppError::Config(e.to_string()))?;

        let allow_unversioned: bool = parse_or(&lookup, "ALLOW_UNVERSIONED_WRITES", false)?;

        let claim_lease_ms: u64 = parse_or(&lookup, "OUTBOX_CLAIM_LEASE_MS", 300_000)?;
        if claim_lease_ms == 0 {
            return Err(AppError::Config(
                "OUTBOX_CLAIM_LEASE_MS must be greater than zero".into(),
            ));
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            relay: RelayConfig {
                dispatch_interval: Duration::from_millis(dispatch_interval_ms),
                batch_size,
            },
            retry,
            transport_base_url: required(&lookup, "TRANSPORT_BASE_URL")?,
            transport_timeout: Duration::from_millis(parse_or(
                &lookup,
                "TRANSPORT_TIMEOUT_MS",
                5000,
            )?),
            concurrency_mode: if allow_unversioned {
                ConcurrencyMode::Relaxed
            } else {
                ConcurrencyMode::Strict
            },
            outbox_claim_lease: Duration::from_millis(claim_lease_ms),
            shutdown_grace: Duration::from_millis(parse_or(
                &lookup,
                "SHUTDOWN_GRACE_PERIOD_MS",
                10_000,
            )?),
        })
    }

    /// The address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, AppError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/leaderboard"),
        ("TRANSPORT_BASE_URL", "http://broker:8080/topics"),
    ];

    #[test]
    fn test_defaults_apply_when_only_required_vars_are_set() {
        let config = config_from(&REQUIRED).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.relay, RelayConfig::default());
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.transport_timeout, Duration::from_secs(5));
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Strict);
        assert_eq!(config.outbox_claim_lease, Duration::from_secs(300));
        assert_eq!(config.shutdown_grace, Duration::from_secs(10));
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("OUTBOX_DISPATCH_INTERVAL_MS", "250"),
            ("OUTBOX_BATCH_SIZE", "20"),
            ("OUTBOX_RETRY_MAX_ATTEMPTS", "5"),
            ("OUTBOX_RETRY_BASE_DELAY_MS", "100"),
            ("OUTBOX_RETRY_MAX_DELAY_MS", "60000"),
            ("OUTBOX_RETRY_GROWTH_FACTOR", "3"),
            ("ALLOW_UNVERSIONED_WRITES", "true"),
            ("OUTBOX_CLAIM_LEASE_MS", "45000"),
            ("SHUTDOWN_GRACE_PERIOD_MS", "2500"),
        ]);

        let config = config_from(&pairs).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.relay.dispatch_interval, Duration::from_millis(250));
        assert_eq!(config.relay.batch_size, 20);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(100));
        assert_eq!(config.retry.max_delay, Duration::from_secs(60));
        assert!((config.retry.growth_factor - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Relaxed);
        assert_eq!(config.outbox_claim_lease, Duration::from_secs(45));
        assert_eq!(config.shutdown_grace, Duration::from_millis(2500));
    }

    #[test]
    fn test_missing_required_vars_are_reported() {
        let missing_db = config_from(&[REQUIRED[1]]);
        let missing_transport = config_from(&[REQUIRED[0]]);

        assert!(matches!(
            missing_db,
            Err(AppError::Config(msg)) if msg.contains("DATABASE_URL")
        ));
        assert!(matches!(
            missing_transport,
            Err(AppError::Config(msg)) if msg.contains("TRANSPORT_BASE_URL")
        ));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for (key, value) in [
            ("PORT", "http"),
            ("OUTBOX_DISPATCH_INTERVAL_MS", "0"),
            ("OUTBOX_BATCH_SIZE", "0"),
            ("OUTBOX_RETRY_MAX_ATTEMPTS", "0"),
            ("OUTBOX_RETRY_GROWTH_FACTOR", "0.5"),
            ("OUTBOX_RETRY_BASE_DELAY_MS", "9000000"),
            ("ALLOW_UNVERSIONED_WRITES", "yes"),
            ("OUTBOX_CLAIM_LEASE_MS", "0"),
            ("SHUTDOWN_GRACE_PERIOD_MS", "-1"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, value));

            let result = config_from(&pairs);

            assert!(
                matches!(result, Err(AppError::Config(_))),
                "{key}={value} should be rejected"
            );
        }
    }
}
