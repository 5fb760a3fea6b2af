//! Connection options
//!
//! Options can be built in code, deserialized, or read from the environment
//! (a `.env` file is loaded first when present).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::MAX_MESSAGE_SIZE;

pub const DEFAULT_ADDRESS: &str = "localhost:28015";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOpts {
    /// Server address, `host:port`
    pub address: String,
    /// Default database sent with every query
    pub database: Option<String>,
    /// Timeout for connecting and for each round trip
    pub timeout_ms: Option<u64>,
    pub max_message_size: usize,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            database: None,
            timeout_ms: None,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl ConnectOpts {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ..Self::default()
        }
    }

    /// Read `REQL_ADDR`, `REQL_DB`, `REQL_TIMEOUT_MS` and `REQL_MAX_MESSAGE_SIZE`.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Failed to load .env file: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut opts = Self::default();

        if let Some(address) = lookup("REQL_ADDR") {
            opts.address = address;
        }
        opts.database = lookup("REQL_DB").filter(|db| !db.is_empty());
        if let Some(raw) = lookup("REQL_TIMEOUT_MS") {
            let ms = raw
                .parse()
                .map_err(|_| Error::Config(format!("REQL_TIMEOUT_MS is not a number: {}", raw)))?;
            opts.timeout_ms = Some(ms);
        }
        if let Some(raw) = lookup("REQL_MAX_MESSAGE_SIZE") {
            opts.max_message_size = raw.parse().map_err(|_| {
                Error::Config(format!("REQL_MAX_MESSAGE_SIZE is not a number: {}", raw))
            })?;
        }

        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(Error::Config("address must not be empty".to_string()));
        }
        if self.max_message_size == 0 || self.max_message_size > MAX_MESSAGE_SIZE {
            return Err(Error::Config(format!(
                "max_message_size must be between 1 and {}",
                MAX_MESSAGE_SIZE
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
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
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let opts = ConnectOpts::from_lookup(lookup(&[])).unwrap();
        assert_eq!(opts, ConnectOpts::default());
        assert_eq!(opts.timeout(), None);
    }

    #[test]
    fn test_env_values() {
        let opts = ConnectOpts::from_lookup(lookup(&[
            ("REQL_ADDR", "10.0.0.5:28015"),
            ("REQL_DB", "blog"),
            ("REQL_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(opts.address, "10.0.0.5:28015");
        assert_eq!(opts.database.as_deref(), Some("blog"));
        assert_eq!(opts.timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_bad_timeout() {
        let err = ConnectOpts::from_lookup(lookup(&[("REQL_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("REQL_TIMEOUT_MS")));
    }

    #[test]
    fn test_message_size_bounds() {
        let err =
            ConnectOpts::from_lookup(lookup(&[("REQL_MAX_MESSAGE_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_deserialize_partial() {
        let opts: ConnectOpts = serde_json::from_str(r#"{"database": "blog"}"#).unwrap();
        assert_eq!(opts.address, DEFAULT_ADDRESS);
        assert_eq!(opts.database.as_deref(), Some("blog"));
    }
}
