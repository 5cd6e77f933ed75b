//! Connection pool configuration
//!
//! Supplied once to [`crate::Db::init`]; there is no runtime reconfiguration.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DbError, Result};

const DEFAULT_MAX_OPEN_CONNS: u32 = 10;
const DEFAULT_MAX_IDLE_CONNS: u32 = 2;
const DEFAULT_CONN_MAX_LIFETIME_SECS: u64 = 30 * 60;
const DEFAULT_CONN_MAX_IDLE_SECS: u64 = 10 * 60;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Database backends compiled into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Postgres,
    Sqlite,
}

impl Driver {
    /// URL schemes accepted for this driver.
    pub fn schemes(self) -> &'static [&'static str] {
        match self {
            Driver::Postgres => &["postgres", "postgresql"],
            Driver::Sqlite => &["sqlite"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::Sqlite => "sqlite",
        }
    }
}

impl FromStr for Driver {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgx" => Ok(Driver::Postgres),
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            other => Err(DbError::config(format!("unsupported driver '{other}'"))),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pool settings.
///
/// Durations are whole seconds; `0` disables the corresponding limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Driver name, e.g. `postgres` or `sqlite`
    pub driver: String,
    /// Connection URL (DSN)
    pub url: String,
    pub max_open_conns: u32,
    /// Connections kept warm in the pool
    pub max_idle_conns: u32,
    pub conn_max_lifetime_secs: u64,
    pub conn_max_idle_secs: u64,
    /// How long a caller waits for a free connection before failing
    pub acquire_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Postgres.as_str().to_string(),
            url: String::new(),
            max_open_conns: DEFAULT_MAX_OPEN_CONNS,
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            conn_max_lifetime_secs: DEFAULT_CONN_MAX_LIFETIME_SECS,
            conn_max_idle_secs: DEFAULT_CONN_MAX_IDLE_SECS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl DbConfig {
    pub fn new(driver: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `DATABASE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay any `DATABASE_*` environment variables onto `self`.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(driver) = env::var("DATABASE_DRIVER") {
            self.driver = driver;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.url = url;
        }
        if let Some(v) = env_number("DATABASE_MAX_OPEN_CONNS")? {
            self.max_open_conns = v;
        }
        if let Some(v) = env_number("DATABASE_MAX_IDLE_CONNS")? {
            self.max_idle_conns = v;
        }
        if let Some(v) = env_number("DATABASE_CONN_MAX_LIFETIME_SECS")? {
            self.conn_max_lifetime_secs = v;
        }
        if let Some(v) = env_number("DATABASE_CONN_MAX_IDLE_SECS")? {
            self.conn_max_idle_secs = v;
        }
        if let Some(v) = env_number("DATABASE_ACQUIRE_TIMEOUT_SECS")? {
            self.acquire_timeout_secs = v;
        }
        Ok(())
    }

    /// Check the settings without touching the network.
    pub fn validate(&self) -> Result<Driver> {
        let driver: Driver = self.driver.parse()?;

        if self.url.trim().is_empty() {
            return Err(DbError::config("database url is empty"));
        }
        let scheme = self.url.split(':').next().unwrap_or_default();
        if !driver.schemes().contains(&scheme) {
            return Err(DbError::config(format!(
                "url scheme '{scheme}' does not match driver '{driver}'"
            )));
        }
        if self.max_open_conns == 0 {
            return Err(DbError::config("max_open_conns must be at least 1"));
        }
        Ok(driver)
    }

    /// Idle connections can never exceed open connections.
    pub fn effective_idle_conns(&self) -> u32 {
        self.max_idle_conns.min(self.max_open_conns)
    }

    pub fn conn_max_lifetime(&self) -> Option<Duration> {
        non_zero_secs(self.conn_max_lifetime_secs)
    }

    pub fn conn_max_idle_time(&self) -> Option<Duration> {
        non_zero_secs(self.conn_max_idle_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// The URL with any password replaced, safe for logs.
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        let Some((userinfo, host)) = rest.rsplit_once('@') else {
            return self.url.clone();
        };
        match userinfo.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
            None => self.url.clone(),
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn env_number<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DbError::config(format!("{key} must be a number, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}
