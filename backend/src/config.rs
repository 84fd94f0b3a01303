use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::store::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:../data/goalscope.db";
pub const DEFAULT_DATA_FILE: &str = "../data/matches.json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Rest,
    Sqlite,
    /// Rows loaded from a JSON file; inserts live until the process exits.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestConfig {
    pub url: String,
    pub api_key: String,
}

/// Settings read from the environment (and `.env` through `dotenv`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: StoreBackend,
    /// `None` unless both URL and key are set.
    pub rest: Option<RestConfig>,
    pub request_timeout: Duration,
    pub database_url: String,
    pub data_file: PathBuf,
    pub default_page_size: u32,
    /// Fixed seed for reproducible predictions.
    pub prediction_seed: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(opt_env)
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("MATCH_STORE").map(|v| v.to_lowercase()).as_deref() {
            Some("sqlite") => StoreBackend::Sqlite,
            Some("memory") => StoreBackend::Memory,
            Some("rest") | None => StoreBackend::Rest,
            Some(other) => {
                tracing::warn!("Unknown MATCH_STORE '{}', using rest", other);
                StoreBackend::Rest
            }
        };

        let rest = match (lookup("MATCH_API_URL"), lookup("MATCH_API_KEY")) {
            (Some(url), Some(api_key)) => Some(RestConfig { url, api_key }),
            _ => None,
        };

        let request_timeout = Duration::from_secs(
            lookup("MATCH_API_TIMEOUT_SECS")
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS)
                .max(1),
        );

        let default_page_size = lookup("DEFAULT_PAGE_SIZE")
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        Self {
            backend,
            rest,
            request_timeout,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            data_file: lookup("MATCH_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            default_page_size,
            prediction_seed: lookup("PREDICTION_SEED").and_then(|val| val.parse::<u64>().ok()),
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.backend, StoreBackend::Rest);
        assert!(cfg.rest.is_none());
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.default_page_size, 20);
        assert_eq!(cfg.data_file, PathBuf::from(DEFAULT_DATA_FILE));
        assert_eq!(cfg.prediction_seed, None);
    }

    #[test]
    fn test_memory_store_settings() {
        let cfg = config(&[
            ("MATCH_STORE", "memory"),
            ("MATCH_DATA_FILE", "/tmp/nb1.json"),
            ("PREDICTION_SEED", "42"),
        ]);
        assert_eq!(cfg.backend, StoreBackend::Memory);
        assert_eq!(cfg.data_file, PathBuf::from("/tmp/nb1.json"));
        assert_eq!(cfg.prediction_seed, Some(42));

        assert_eq!(config(&[("PREDICTION_SEED", "-1")]).prediction_seed, None);
    }

    #[test]
    fn test_rest_needs_url_and_key() {
        assert!(config(&[("MATCH_API_URL", "https://db.example.com")]).rest.is_none());

        let cfg = config(&[("MATCH_API_URL", "https://db.example.com"), ("MATCH_API_KEY", "anon")]);
        assert_eq!(
            cfg.rest,
            Some(RestConfig {
                url: "https://db.example.com".to_string(),
                api_key: "anon".to_string(),
            })
        );
    }

    #[test]
    fn test_overrides_and_clamping() {
        let cfg = config(&[
            ("MATCH_STORE", "SQLite"),
            ("MATCH_API_TIMEOUT_SECS", "30"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("DEFAULT_PAGE_SIZE", "500"),
        ]);
        assert_eq!(cfg.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.default_page_size, 100);

        let cfg = config(&[("MATCH_STORE", "mongo"), ("DEFAULT_PAGE_SIZE", "abc")]);
        assert_eq!(cfg.backend, StoreBackend::Rest);
        assert_eq!(cfg.default_page_size, 20);
    }
}
