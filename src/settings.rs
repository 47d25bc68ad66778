//! Runtime settings.
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file
//! (`ledger.toml` in the working directory unless a path is given), then
//! `LEDGER_*` environment variables. CLI flags override the result.
use crate::domain::validation::ValidationMode;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub workers: usize,
    pub heartbeat_ms: u64,
    pub cache_ttl_secs: u64,
    pub import_timeout_ms: Option<u64>,
    pub validation: ValidationMode,
    pub log_level: String,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("ledger").required(false),
        };

        Config::builder()
            .set_default("workers", 4)?
            .set_default("heartbeat_ms", 500)?
            .set_default("cache_ttl_secs", 30)?
            .set_default("validation", "lenient")?
            .set_default("log_level", "info")?
            .add_source(file)
            .add_source(Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn import_timeout(&self) -> Option<Duration> {
        self.import_timeout_ms.map(Duration::from_millis)
    }
}
