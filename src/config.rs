use std::str::FromStr;
use std::time::Duration;

use config::ConfigError;
use rust_decimal::Decimal;

pub const DEFAULT_JOBCOIN_API_URL: &str = "https://jobcoin.gemini.com/casino-unit/api";

/// Which ledger implementation backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Jobcoin,
    Memory,
}

#[derive(Debug, Clone)]
pub struct MixerConfig {
    pub bind_address: String,
    pub ledger_backend: LedgerBackend,
    pub jobcoin_api_url: String,
    pub ledger_timeout: Duration,
    /// Minted at startup when unset
    pub house_address: Option<String>,
    pub sweep_interval: Duration,
    pub settlement_interval: Duration,
    /// Cap on how much entitlement is paid out in one round
    pub distribution_increment: Decimal,
    /// Below this remainder the split loop stops drawing random shares
    pub distribution_epsilon: Decimal,
    /// Registration requests allowed per minute
    pub registration_rate_limit: u32,
}

impl MixerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` feeds it the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ledger_backend = match lookup("LEDGER_BACKEND").as_deref() {
            None | Some("jobcoin") => LedgerBackend::Jobcoin,
            Some("memory") => LedgerBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Message(format!(
                    "LEDGER_BACKEND must be 'jobcoin' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let house_address = lookup("HOUSE_ADDRESS")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let config = Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            ledger_backend,
            jobcoin_api_url: lookup("JOBCOIN_API_URL")
                .unwrap_or_else(|| DEFAULT_JOBCOIN_API_URL.to_string()),
            ledger_timeout: Duration::from_secs(parse_or(&lookup, "LEDGER_TIMEOUT_SECS", 10)?),
            house_address,
            sweep_interval: Duration::from_secs(parse_or(&lookup, "SWEEP_INTERVAL_SECS", 5)?),
            settlement_interval: Duration::from_secs(parse_or(
                &lookup,
                "SETTLEMENT_INTERVAL_SECS",
                6,
            )?),
            distribution_increment: parse_or(
                &lookup,
                "DISTRIBUTION_INCREMENT",
                Decimal::new(50, 1),
            )?,
            distribution_epsilon: parse_or(&lookup, "DISTRIBUTION_EPSILON", Decimal::new(1, 4))?,
            registration_rate_limit: parse_or(&lookup, "REGISTRATION_RATE_LIMIT", 60)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() || self.settlement_interval.is_zero() {
            return Err(ConfigError::Message(
                "polling intervals must be at least one second".to_string(),
            ));
        }
        if self.ledger_timeout.is_zero() {
            return Err(ConfigError::Message(
                "LEDGER_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        if self.distribution_increment <= Decimal::ZERO {
            return Err(ConfigError::Message(
                "DISTRIBUTION_INCREMENT must be positive".to_string(),
            ));
        }
        if self.distribution_epsilon < Decimal::ZERO {
            return Err(ConfigError::Message(
                "DISTRIBUTION_EPSILON must not be negative".to_string(),
            ));
        }
        if self.registration_rate_limit == 0 {
            return Err(ConfigError::Message(
                "REGISTRATION_RATE_LIMIT must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::Message(format!("invalid {}='{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MixerConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.ledger_backend, LedgerBackend::Jobcoin);
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.settlement_interval, Duration::from_secs(6));
        assert_eq!(config.distribution_increment, dec!(5.0));
        assert_eq!(config.distribution_epsilon, dec!(0.0001));
        assert!(config.house_address.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = MixerConfig::from_lookup(lookup_from(&[
            ("LEDGER_BACKEND", "memory"),
            ("HOUSE_ADDRESS", " house-1 "),
            ("SWEEP_INTERVAL_SECS", "2"),
            ("DISTRIBUTION_INCREMENT", "12.5"),
        ]))
        .unwrap();

        assert_eq!(config.ledger_backend, LedgerBackend::Memory);
        assert_eq!(config.house_address.as_deref(), Some("house-1"));
        assert_eq!(config.sweep_interval, Duration::from_secs(2));
        assert_eq!(config.distribution_increment, dec!(12.5));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(MixerConfig::from_lookup(lookup_from(&[("SWEEP_INTERVAL_SECS", "0")])).is_err());
        assert!(MixerConfig::from_lookup(lookup_from(&[("DISTRIBUTION_INCREMENT", "-1")])).is_err());
        assert!(MixerConfig::from_lookup(lookup_from(&[("DISTRIBUTION_EPSILON", "abc")])).is_err());
        assert!(MixerConfig::from_lookup(lookup_from(&[("LEDGER_BACKEND", "sqlite")])).is_err());
    }
}
