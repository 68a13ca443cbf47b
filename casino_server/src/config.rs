//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use casino::{db::DatabaseConfig, wallet::MAX_PAGE_SIZE};
use std::{net::SocketAddr, str::FromStr};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Where balances live
    pub store: StoreBackend,
    /// Database configuration (unused with the memory store)
    pub database: DatabaseConfig,
    /// Prometheus scrape address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Table limits
    pub roulette: RouletteConfig,
    /// Accounts created at startup by the memory store
    pub memory_seed: MemorySeedConfig,
}

/// Account store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Roulette table limits
#[derive(Debug, Clone)]
pub struct RouletteConfig {
    /// Largest amount accepted on a single wager
    pub max_wager: i64,
    /// Default page size for history and stats
    pub history_limit: i64,
}

impl Default for RouletteConfig {
    fn default() -> Self {
        Self {
            max_wager: 100_000,
            history_limit: 50,
        }
    }
}

/// Seed accounts for the memory store
#[derive(Debug, Clone, Default)]
pub struct MemorySeedConfig {
    /// Starting balance of every seeded account
    pub default_balance: i64,
    /// Account ids to create
    pub accounts: Vec<i64>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `memory` - Use the in-memory store (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_or("SERVER_BIND", SocketAddr::from(([127, 0, 0, 1], 6969)))?,
        };

        let database_defaults = DatabaseConfig::development();
        let database = DatabaseConfig {
            database_url: database_url_override
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .unwrap_or(database_defaults.database_url),
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 100)?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5)?,
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 5)?,
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 300)?,
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800)?,
            transaction_timeout_secs: parse_env_or("DB_TRANSACTION_TIMEOUT_SECS", 10)?,
        };

        let store = if memory || parse_env_or("USE_MEMORY_STORE", false)? {
            StoreBackend::Memory
        } else {
            StoreBackend::Postgres
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(raw) => Some(parse_value("METRICS_BIND", &raw)?),
            Err(_) => None,
        };

        let roulette_defaults = RouletteConfig::default();
        let roulette = RouletteConfig {
            max_wager: parse_env_or("ROULETTE_MAX_WAGER", roulette_defaults.max_wager)?,
            history_limit: parse_env_or("ROULETTE_HISTORY_LIMIT", roulette_defaults.history_limit)?,
        };

        let memory_seed = MemorySeedConfig {
            default_balance: parse_env_or("DEFAULT_BALANCE", 10_000)?,
            accounts: match std::env::var("MEMORY_SEED_ACCOUNTS") {
                Ok(raw) => parse_account_list(&raw)?,
                Err(_) => Vec::new(),
            },
        };

        Ok(ServerConfig {
            bind,
            store,
            database,
            metrics_bind,
            roulette,
            memory_seed,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roulette.max_wager <= 0 {
            return Err(ConfigError::Invalid {
                var: "ROULETTE_MAX_WAGER".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.roulette.history_limit) {
            return Err(ConfigError::Invalid {
                var: "ROULETTE_HISTORY_LIMIT".to_string(),
                reason: format!("Must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }

        if self.memory_seed.default_balance < 0 {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_BALANCE".to_string(),
                reason: "Must not be negative".to_string(),
            });
        }

        if self.store == StoreBackend::Postgres {
            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }

            if self.database.transaction_timeout_secs == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_TRANSACTION_TIMEOUT_SECS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a raw value, naming the variable on failure
fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("{raw:?}: {e}"),
    })
}

/// Helper to parse environment variable with default fallback when unset
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

/// Comma separated account ids, e.g. `1,2,3`
fn parse_account_list(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| parse_value("MEMORY_SEED_ACCOUNTS", id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            store: StoreBackend::Postgres,
            database: DatabaseConfig::development(),
            metrics_bind: None,
            roulette: RouletteConfig::default(),
            memory_seed: MemorySeedConfig::default(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "ROULETTE_MAX_WAGER".to_string(),
            reason: "Must be greater than 0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ROULETTE_MAX_WAGER"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_max_wager_zero() {
        let mut config = test_config();
        config.roulette.max_wager = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { var, .. } if var == "ROULETTE_MAX_WAGER"
        ));
    }

    #[test]
    fn test_config_validation_history_limit_out_of_range() {
        let mut config = test_config();
        config.roulette.history_limit = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());
        config.roulette.history_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_settings_ignored_for_memory_store() {
        let mut config = test_config();
        config.database.min_connections = config.database.max_connections + 1;
        assert!(config.validate().is_err());

        config.store = StoreBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_value_names_variable() {
        let err = parse_value::<i64>("ROULETTE_MAX_WAGER", "lots").unwrap_err();
        assert!(err.to_string().contains("ROULETTE_MAX_WAGER"));
        assert_eq!(parse_value::<i64>("X", " 42 ").unwrap(), 42);
    }

    #[test]
    fn test_parse_account_list() {
        assert_eq!(parse_account_list("1, 2,3,").unwrap(), vec![1, 2, 3]);
        assert!(parse_account_list("").unwrap().is_empty());
        assert!(parse_account_list("1,two").is_err());
    }
}
