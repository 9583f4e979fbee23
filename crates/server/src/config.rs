use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_hours: i64,
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse {key}"))
}

impl Config {
    /// Read configuration from the process environment, loading `.env` first
    /// when one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            server: ServerConfig {
                host: lookup("PYLEARN_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: parsed(&lookup, "PYLEARN_PORT", "5000")?,
            },
            database: DatabaseConfig {
                url: normalize_sqlite_url(
                    &lookup("PYLEARN_DB_URL")
                        .unwrap_or_else(|| "sqlite://pylearn.sqlite3".to_string()),
                ),
                max_connections: parsed(&lookup, "PYLEARN_DB_MAX_CONNECTIONS", "5")?,
            },
            session: SessionConfig {
                ttl_hours: parsed(&lookup, "PYLEARN_SESSION_TTL_HOURS", "24")?,
            },
        };

        if config.session.ttl_hours <= 0 {
            anyhow::bail!("PYLEARN_SESSION_TTL_HOURS must be positive");
        }

        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session.ttl_hours)
    }
}

/// Turn a bare path or partial `sqlite:` URL into an absolute `sqlite://`
/// URL that creates the file on first use. In-memory URLs and URLs that
/// already pick a `mode` pass through untouched.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw == "sqlite::memory:" || raw.contains("mode=") {
        return raw.to_string();
    }

    let (location, query) = match raw.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (raw, None),
    };
    let path_str = location
        .strip_prefix("sqlite://")
        .or_else(|| location.strip_prefix("sqlite:"))
        .unwrap_or(location);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    match query {
        Some(query) => format!("sqlite://{}?{query}&mode=rwc", absolute.display()),
        None => format!("sqlite://{}?mode=rwc", absolute.display()),
    }
}

/// File path behind a `sqlite://` URL, if it names a file at all.
pub fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server_address(), "127.0.0.1:5000");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.session.ttl_hours, 24);
        assert!(config.database.url.starts_with("sqlite://"));
        assert!(config.database.url.ends_with("pylearn.sqlite3?mode=rwc"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PYLEARN_HOST", "0.0.0.0"),
            ("PYLEARN_PORT", "8080"),
            ("PYLEARN_DB_URL", "sqlite::memory:"),
            ("PYLEARN_DB_MAX_CONNECTIONS", "1"),
            ("PYLEARN_SESSION_TTL_HOURS", "2"),
        ]))
        .unwrap();
        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 1);
        assert_eq!(config.session_ttl(), chrono::Duration::hours(2));
    }

    #[test]
    fn bad_numbers_are_reported_by_key() {
        let err = Config::from_lookup(lookup(&[("PYLEARN_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PYLEARN_PORT"));

        let err = Config::from_lookup(lookup(&[("PYLEARN_SESSION_TTL_HOURS", "0")])).unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(
            normalize_sqlite_url("sqlite:///var/lib/pylearn.db"),
            "sqlite:///var/lib/pylearn.db?mode=rwc"
        );
        assert_eq!(
            normalize_sqlite_url("/tmp/a.db?cache=shared"),
            "sqlite:///tmp/a.db?cache=shared&mode=rwc"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:file:t?mode=memory&cache=shared"),
            "sqlite:file:t?mode=memory&cache=shared"
        );
        assert!(normalize_sqlite_url("data/dev.db").ends_with("/data/dev.db?mode=rwc"));
    }

    #[test]
    fn file_path_is_extracted_from_url() {
        assert_eq!(
            sqlite_file_path("sqlite:///tmp/a.db?mode=rwc"),
            Some(PathBuf::from("/tmp/a.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
    }
}
