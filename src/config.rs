use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub cache_ttl: Duration,
    pub backup_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset, unparsable
    /// numbers fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT").map(|v| v.parse::<u16>()) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                tracing::warn!("PORT is not a valid port ({e}), using 3000");
                3000
            }
            None => 3000,
        };

        let cache_ttl = match var("EMOTION_CACHE_TTL_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) => Duration::from_secs(secs),
            Some(Err(e)) => {
                tracing::warn!("EMOTION_CACHE_TTL_SECS is not a number ({e}), using default");
                DEFAULT_TTL
            }
            None => DEFAULT_TTL,
        };

        Self {
            api_url: var("DIARY_API_URL").unwrap_or_else(|| "http://localhost:5000".into()),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:data/moodiary.db".into()),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            cache_ttl,
            backup_dir: var("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("backups")),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.database_url, "sqlite:data/moodiary.db");
        assert_eq!(config.listen_addr(), "0.0.0.0:3000");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.backup_dir, PathBuf::from("backups"));
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let config = config(&[
            ("DIARY_API_URL", "http://diary.local:8000/api"),
            ("PORT", "not-a-port"),
            ("HOST", "127.0.0.1"),
            ("EMOTION_CACHE_TTL_SECS", "5"),
            ("BACKUP_DIR", " "),
        ]);
        assert_eq!(config.api_url, "http://diary.local:8000/api");
        assert_eq!(config.listen_addr(), "127.0.0.1:3000");
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.backup_dir, PathBuf::from("backups"));
    }
}
