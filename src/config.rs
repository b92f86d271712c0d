use std::{env, num::ParseIntError, path::PathBuf};

use chrono::{Duration, Utc};
use classroom_server::DEFAULT_PORT;
use log::LevelFilter;
use thiserror::Error;

pub const DEFAULT_STORE_URL: &str = "http://localhost:3001";
pub const DEFAULT_SESSION_DAYS: i64 = 7;

/// Which data layer to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    /// The remote REST store at [Config::store_url]
    Rest,
    /// An in-process store that forgets everything on exit
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreKind,
    pub store_url: String,
    /// Sessions are kept in memory if unset
    pub session_file: Option<PathBuf>,
    /// How long a login stays valid
    pub session_duration: Duration,
    /// Applies to the workspace crates only
    pub log_level: LevelFilter,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a number: {source}")]
    NotANumber {
        name: &'static str,
        source: ParseIntError,
    },
    #[error("{name} must be positive")]
    NotPositive { name: &'static str },
    #[error("{name} is too large")]
    OutOfRange { name: &'static str },
    #[error("CLASSROOM_STORE must be \"rest\" or \"memory\", got \"{0}\"")]
    UnknownStore(String),
    #[error("CLASSROOM_LOG must be a log level such as info or debug, got \"{0}\"")]
    UnknownLogLevel(String),
}

impl Config {
    /// Reads the configuration from `CLASSROOM_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("CLASSROOM_PORT") {
            Some(port) => port.parse().map_err(|source| ConfigError::NotANumber {
                name: "CLASSROOM_PORT",
                source,
            })?,
            None => DEFAULT_PORT,
        };

        let store = match lookup("CLASSROOM_STORE").as_deref() {
            None | Some("rest") => StoreKind::Rest,
            Some("memory") => StoreKind::Memory,
            Some(other) => return Err(ConfigError::UnknownStore(other.to_string())),
        };

        let session_days = match lookup("CLASSROOM_SESSION_DAYS") {
            Some(days) => days.parse().map_err(|source| ConfigError::NotANumber {
                name: "CLASSROOM_SESSION_DAYS",
                source,
            })?,
            None => DEFAULT_SESSION_DAYS,
        };

        if session_days <= 0 {
            return Err(ConfigError::NotPositive {
                name: "CLASSROOM_SESSION_DAYS",
            });
        }

        // Every session issued from now on must have a representable expiry
        let session_duration = Duration::try_days(session_days)
            .filter(|d| Utc::now().checked_add_signed(*d).is_some())
            .ok_or(ConfigError::OutOfRange {
                name: "CLASSROOM_SESSION_DAYS",
            })?;

        let log_level = match lookup("CLASSROOM_LOG") {
            Some(level) => level
                .parse::<LevelFilter>()
                .map_err(|_| ConfigError::UnknownLogLevel(level))?,
            None => LevelFilter::Info,
        };

        Ok(Self {
            port,
            store,
            store_url: lookup("CLASSROOM_STORE_URL").unwrap_or_else(|| DEFAULT_STORE_URL.into()),
            session_file: lookup("CLASSROOM_SESSION_FILE").map(PathBuf::from),
            session_duration,
            log_level,
        })
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use chrono::Duration;
    use log::LevelFilter;

    use super::{Config, ConfigError, StoreKind, DEFAULT_STORE_URL};

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.port, 9050);
        assert_eq!(config.store, StoreKind::Rest);
        assert_eq!(config.store_url, DEFAULT_STORE_URL);
        assert_eq!(config.session_file, None);
        assert_eq!(config.session_duration, Duration::days(7));
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            config(&[("CLASSROOM_PORT", "eighty")]),
            Err(ConfigError::NotANumber { .. })
        ));
        assert!(matches!(
            config(&[("CLASSROOM_STORE", "postgres")]),
            Err(ConfigError::UnknownStore(_))
        ));
        assert!(matches!(
            config(&[("CLASSROOM_SESSION_DAYS", "0")]),
            Err(ConfigError::NotPositive { .. })
        ));
        assert!(matches!(
            config(&[("CLASSROOM_SESSION_DAYS", "200000000")]),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            config(&[("CLASSROOM_SESSION_DAYS", "900000000000000")]),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            config(&[("CLASSROOM_LOG", "loud")]),
            Err(ConfigError::UnknownLogLevel(_))
        ));
    }

    #[test]
    fn memory_store() {
        let config = config(&[
            ("CLASSROOM_STORE", "memory"),
            ("CLASSROOM_PORT", "8080"),
            ("CLASSROOM_LOG", "debug"),
        ])
        .unwrap();

        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }
}
