//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use rust_decimal::Decimal;

use paygate_hex::{PublisherConfig, RetryPolicy};
use paygate_repo::events::DEFAULT_PUBLISH_TIMEOUT;
use paygate_types::{GatewayId, TransitionPolicy};

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    /// `None` selects the in-memory store with the default gateway directory.
    pub database_url: Option<String>,
    pub retry: RetryPolicy,
    pub publisher: PublisherConfig,
    pub event_webhook_url: Option<String>,
    pub event_signing_secret: Option<String>,
    pub event_publish_timeout: Duration,
    pub gateway_api_keys: Vec<(GatewayId, String)>,
    pub transition_policy: TransitionPolicy,
    pub simulated_balance: Decimal,
    pub simulated_gateway_latency: Duration,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(&var, "GATEWAY_MAX_ATTEMPTS", retry_defaults.max_attempts)?,
            attempt_timeout: Duration::from_secs(parse_or(
                &var,
                "GATEWAY_TIMEOUT_SECS",
                retry_defaults.attempt_timeout.as_secs(),
            )?),
            delay: Duration::from_millis(parse_or(
                &var,
                "GATEWAY_RETRY_DELAY_MS",
                retry_defaults.delay.as_millis() as u64,
            )?),
        };
        if retry.max_attempts == 0 {
            return Err(anyhow!("GATEWAY_MAX_ATTEMPTS must be at least 1"));
        }

        let publisher_defaults = PublisherConfig::default();
        let publisher = PublisherConfig {
            queue_capacity: parse_or(
                &var,
                "EVENT_QUEUE_CAPACITY",
                publisher_defaults.queue_capacity,
            )?,
            workers: parse_or(&var, "EVENT_WORKERS", publisher_defaults.workers)?,
            failure_threshold: parse_or(
                &var,
                "BREAKER_FAILURE_THRESHOLD",
                publisher_defaults.failure_threshold,
            )?,
            cooldown: Duration::from_secs(parse_or(
                &var,
                "BREAKER_COOLDOWN_SECS",
                publisher_defaults.cooldown.as_secs(),
            )?),
        };
        if publisher.queue_capacity == 0 || publisher.workers == 0 {
            return Err(anyhow!(
                "EVENT_QUEUE_CAPACITY and EVENT_WORKERS must be at least 1"
            ));
        }

        let event_publish_timeout = Duration::from_secs(parse_or(
            &var,
            "EVENT_PUBLISH_TIMEOUT_SECS",
            DEFAULT_PUBLISH_TIMEOUT.as_secs(),
        )?);
        if event_publish_timeout.is_zero() {
            return Err(anyhow!("EVENT_PUBLISH_TIMEOUT_SECS must be at least 1"));
        }

        let gateway_api_keys = match var("GATEWAY_API_KEYS") {
            Some(raw) => parse_gateway_keys(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            port: parse_or(&var, "PORT", 3000)?,
            database_url: var("DATABASE_URL"),
            retry,
            publisher,
            event_webhook_url: var("EVENT_WEBHOOK_URL"),
            event_signing_secret: var("EVENT_SIGNING_SECRET"),
            event_publish_timeout,
            gateway_api_keys,
            transition_policy: parse_or(&var, "STATUS_TRANSITIONS", TransitionPolicy::Strict)?,
            simulated_balance: parse_or(
                &var,
                "SIMULATED_BALANCE",
                Decimal::new(545400, 2),
            )?,
            simulated_gateway_latency: Duration::from_millis(parse_or(
                &var,
                "SIMULATED_GATEWAY_LATENCY_MS",
                0,
            )?),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

fn parse_or<T>(var: impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {name} {raw:?}: {e}")),
        None => Ok(default),
    }
}

/// Parses `gateway_id:key,gateway_id:key`.
pub fn parse_gateway_keys(raw: &str) -> anyhow::Result<Vec<(GatewayId, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, key) = entry
                .split_once(':')
                .with_context(|| format!("GATEWAY_API_KEYS entry {entry:?} is not id:key"))?;
            let id: GatewayId = id
                .trim()
                .parse()
                .with_context(|| format!("GATEWAY_API_KEYS entry {entry:?} has a bad gateway id"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(anyhow!("GATEWAY_API_KEYS entry {entry:?} has an empty key"));
            }
            Ok((id, key.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(20));
        assert_eq!(config.publisher.queue_capacity, 1024);
        assert_eq!(config.publisher.failure_threshold, 5);
        assert_eq!(config.transition_policy, TransitionPolicy::Strict);
        assert_eq!(config.simulated_balance, Decimal::new(545400, 2));
        assert!(config.gateway_api_keys.is_empty());
        assert_eq!(config.event_publish_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "sqlite://data/paygate.db"),
            ("GATEWAY_MAX_ATTEMPTS", "5"),
            ("BREAKER_COOLDOWN_SECS", "2"),
            ("EVENT_PUBLISH_TIMEOUT_SECS", "3"),
            ("STATUS_TRANSITIONS", "permissive"),
            ("GATEWAY_API_KEYS", "112:gw_stripe, 200:gw_paypal"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("sqlite://data/paygate.db"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.publisher.cooldown, Duration::from_secs(2));
        assert_eq!(config.event_publish_timeout, Duration::from_secs(3));
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
        assert_eq!(
            config.gateway_api_keys,
            vec![
                (GatewayId::new(112), "gw_stripe".to_string()),
                (GatewayId::new(200), "gw_paypal".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("PORT", "http")]).is_err());
        assert!(config(&[("GATEWAY_MAX_ATTEMPTS", "0")]).is_err());
        assert!(config(&[("EVENT_PUBLISH_TIMEOUT_SECS", "0")]).is_err());
        assert!(config(&[("STATUS_TRANSITIONS", "lenient")]).is_err());
        assert!(config(&[("GATEWAY_API_KEYS", "stripe:key")]).is_err());
        assert!(config(&[("GATEWAY_API_KEYS", "112:")]).is_err());
    }
}
