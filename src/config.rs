use crate::domain::entities::comparison_config::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS};
use std::str::FromStr;

pub const DEFAULT_DB_PATH: &str = "./pricewise.db";
pub const DEFAULT_HISTORY_TIMEOUT_SECS: u64 = 10;

/// Where trend comparisons read price history from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryProvider {
    /// Derived from stored offers.
    #[default]
    Sqlite,
    Http,
    None,
}

impl FromStr for HistoryProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "local" => Ok(HistoryProvider::Sqlite),
            "http" => Ok(HistoryProvider::Http),
            "none" | "off" => Ok(HistoryProvider::None),
            _ => Err(format!("Unknown history provider: {s}")),
        }
    }
}

/// Runtime settings read from `PRICEWISE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: String,
    pub history_provider: HistoryProvider,
    pub history_url: Option<String>,
    pub history_timeout_secs: u64,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            history_provider: HistoryProvider::default(),
            history_url: None,
            history_timeout_secs: DEFAULT_HISTORY_TIMEOUT_SECS,
            cache_capacity: DEFAULT_CACHE_MAX_ENTRIES,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Unparseable values keep their
    /// defaults and are logged.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            db_path: lookup("PRICEWISE_DB").unwrap_or(defaults.db_path),
            history_provider: parsed(&lookup, "PRICEWISE_HISTORY_PROVIDER", defaults.history_provider),
            history_url: lookup("PRICEWISE_HISTORY_URL").filter(|u| !u.trim().is_empty()),
            history_timeout_secs: parsed(&lookup, "PRICEWISE_HISTORY_TIMEOUT_SECS", defaults.history_timeout_secs),
            cache_capacity: parsed(&lookup, "PRICEWISE_CACHE_CAPACITY", defaults.cache_capacity).max(1),
            cache_ttl_secs: parsed(&lookup, "PRICEWISE_CACHE_TTL_SECS", defaults.cache_ttl_secs),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }),
    }
}
