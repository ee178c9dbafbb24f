use std::net::SocketAddr;
use std::time::Duration;

use auctioneer_models::{Rep, RepId, Stack};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Tuning for one auctioneer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctioneerConfig {
    /// Upper bound on auctions claimed and not yet resolved.
    pub max_concurrent_auctions: usize,

    /// Passed to the bidding engine as `max_rounds`.
    pub max_bidding_rounds: u32,

    /// Upper bound on a single bidding engine call.
    pub auction_timeout: Duration,

    /// Name of the leader lock in the coordination store.
    pub lock_name: String,

    /// How long shutdown waits for in-flight auctions before releasing the
    /// lock. Zero releases immediately.
    pub shutdown_grace: Duration,
}

impl Default for AuctioneerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_auctions: 20,
            max_bidding_rounds: 100,
            auction_timeout: Duration::from_secs(10),
            lock_name: "auctioneer".to_string(),
            shutdown_grace: Duration::ZERO,
        }
    }
}

impl AuctioneerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_auctions == 0 {
            return Err(ConfigError::Zero {
                name: "max_concurrent_auctions",
            });
        }
        if self.max_bidding_rounds == 0 {
            return Err(ConfigError::Zero {
                name: "max_bidding_rounds",
            });
        }
        if self.auction_timeout.is_zero() {
            return Err(ConfigError::Zero {
                name: "auction_timeout",
            });
        }
        if self.lock_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "lock_name",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Process configuration for the auctioneer binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub auctioneer: AuctioneerConfig,
    pub listen_addr: SocketAddr,
    pub log_level: String,
    /// Reps registered in the in-memory store at startup.
    pub dev_reps: Vec<Rep>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AuctioneerConfig::default();

        let max_concurrent_auctions = parse_var(
            &lookup,
            "AUCTIONEER_MAX_CONCURRENT_AUCTIONS",
            defaults.max_concurrent_auctions,
        )?;

        let max_bidding_rounds =
            parse_var(&lookup, "AUCTIONEER_MAX_ROUNDS", defaults.max_bidding_rounds)?;

        let auction_timeout = Duration::from_millis(parse_var(
            &lookup,
            "AUCTIONEER_AUCTION_TIMEOUT_MS",
            defaults.auction_timeout.as_millis() as u64,
        )?);

        let lock_name = lookup("AUCTIONEER_LOCK_NAME").unwrap_or(defaults.lock_name);

        let shutdown_grace = Duration::from_millis(parse_var(
            &lookup,
            "AUCTIONEER_SHUTDOWN_GRACE_MS",
            defaults.shutdown_grace.as_millis() as u64,
        )?);

        let listen_addr = parse_var(
            &lookup,
            "AUCTIONEER_LISTEN_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 8090)),
        )?;

        let log_level = lookup("AUCTIONEER_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let dev_reps = match lookup("AUCTIONEER_DEV_REPS") {
            Some(raw) => parse_reps(&raw)?,
            None => Vec::new(),
        };

        let auctioneer = AuctioneerConfig {
            max_concurrent_auctions,
            max_bidding_rounds,
            auction_timeout,
            lock_name,
            shutdown_grace,
        };
        auctioneer.validate()?;

        Ok(Self {
            auctioneer,
            listen_addr,
            log_level,
            dev_reps,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Parse `id:stack,id:stack`.
fn parse_reps(raw: &str) -> Result<Vec<Rep>, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        var: "AUCTIONEER_DEV_REPS",
        message,
    };

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, stack) = entry
                .split_once(':')
                .ok_or_else(|| invalid(format!("expected id:stack, got '{entry}'")))?;
            let rep_id = id.parse::<RepId>().map_err(|e| invalid(format!("{e}")))?;
            let stack = stack.parse::<Stack>().map_err(|e| invalid(format!("{e}")))?;
            Ok(Rep::new(rep_id, stack))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.auctioneer, AuctioneerConfig::default());
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8090");
        assert_eq!(config.log_level, "info");
        assert!(config.dev_reps.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("AUCTIONEER_MAX_CONCURRENT_AUCTIONS", "2"),
            ("AUCTIONEER_MAX_ROUNDS", "7"),
            ("AUCTIONEER_AUCTION_TIMEOUT_MS", "250"),
            ("AUCTIONEER_LOCK_NAME", "placement"),
            ("AUCTIONEER_SHUTDOWN_GRACE_MS", "1500"),
            ("AUCTIONEER_DEV_REPS", "first-rep:lucid64, second-rep:.Net"),
        ]))
        .unwrap();

        assert_eq!(config.auctioneer.max_concurrent_auctions, 2);
        assert_eq!(config.auctioneer.max_bidding_rounds, 7);
        assert_eq!(config.auctioneer.auction_timeout, Duration::from_millis(250));
        assert_eq!(config.auctioneer.lock_name, "placement");
        assert_eq!(config.auctioneer.shutdown_grace, Duration::from_millis(1500));
        assert_eq!(config.dev_reps.len(), 2);
        assert_eq!(config.dev_reps[1].stack.as_str(), ".Net");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = Config::from_lookup(lookup(&[("AUCTIONEER_MAX_CONCURRENT_AUCTIONS", "0")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Zero {
                name: "max_concurrent_auctions"
            }
        );
    }

    #[test]
    fn test_garbage_number_rejected() {
        let err = Config::from_lookup(lookup(&[("AUCTIONEER_MAX_ROUNDS", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "AUCTIONEER_MAX_ROUNDS",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_dev_rep_rejected() {
        let err = Config::from_lookup(lookup(&[("AUCTIONEER_DEV_REPS", "lonely-rep")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AuctioneerConfig {
            auction_timeout: Duration::ZERO,
            ..AuctioneerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                name: "auction_timeout"
            })
        );
    }
}
