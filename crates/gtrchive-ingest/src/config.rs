//! Daemon configuration loaded from environment variables.

use crate::{Error, Result};
use std::path::PathBuf;

/// Default REST base URL of the stream provider.
pub const DEFAULT_API_URL: &str = "https://api.twitter.com/1.1";

/// Default streaming base URL of the stream provider.
pub const DEFAULT_STREAM_URL: &str = "https://stream.twitter.com/1.1";

/// Full daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stream provider credentials and endpoints.
    pub twitter: TwitterConfig,

    /// Track filter passed to the subscription, verbatim.
    pub track: String,

    /// Storage connection target.
    pub store: StoreConfig,

    /// Table that receives one row per content record.
    pub table: String,
}

/// OAuth credentials and endpoints for the stream provider.
#[derive(Clone, Default)]
pub struct TwitterConfig {
    pub access_token: String,
    pub access_secret: String,
    pub consumer_key: String,
    pub consumer_secret: String,

    /// REST base URL (credential verification).
    pub api_url: String,

    /// Streaming base URL (filtered subscription).
    pub stream_url: String,
}

// Secrets stay out of logs.
impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("access_token", &redact(&self.access_token))
            .field("access_secret", &redact(&self.access_secret))
            .field("consumer_key", &redact(&self.consumer_key))
            .field("consumer_secret", &redact(&self.consumer_secret))
            .field("api_url", &self.api_url)
            .field("stream_url", &self.stream_url)
            .finish()
    }
}

/// Storage connection target and authentication.
#[derive(Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub tls: TlsPaths,
}

impl StoreConfig {
    /// HTTP(S) endpoint of the store. HTTPS is used only when TLS material
    /// passes the CA+cert gate.
    pub fn url(&self) -> String {
        let scheme = if self.tls.is_configured() {
            "https"
        } else {
            "http"
        };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8123,
            database: "gtrchive".to_string(),
            username: "default".to_string(),
            password: String::new(),
            tls: TlsPaths::default(),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("tls", &self.tls)
            .finish()
    }
}

/// Optional mutual-TLS material for the store connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsPaths {
    /// CA bundle used to verify the server.
    pub ca: Option<PathBuf>,
    /// Client certificate chain.
    pub cert: Option<PathBuf>,
    /// Client private key.
    pub key: Option<PathBuf>,
}

impl TlsPaths {
    /// True when both the CA and the certificate are set. The key is not
    /// part of the gate.
    pub fn is_configured(&self) -> bool {
        self.ca.is_some() && self.cert.is_some()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing variables fall back to defaults; credentials and the track
    /// filter default to empty and are never filled in. Empty path variables
    /// are treated as unset.
    ///
    /// - `GTR_TWITTER_ACCESS_TOKEN`, `GTR_TWITTER_ACCESS_SECRET`,
    ///   `GTR_TWITTER_CONSUMER_KEY`, `GTR_TWITTER_CONSUMER_SECRET`
    /// - `GTR_TWITTER_TRACK`
    /// - `GTR_TWITTER_API_URL` (default: [`DEFAULT_API_URL`])
    /// - `GTR_TWITTER_STREAM_URL` (default: [`DEFAULT_STREAM_URL`])
    /// - `GTR_CLICKHOUSE_HOST` (default: "localhost")
    /// - `GTR_CLICKHOUSE_PORT` (default: 8123)
    /// - `GTR_CLICKHOUSE_DATABASE` (default: "gtrchive")
    /// - `GTR_CLICKHOUSE_USERNAME` (default: "default")
    /// - `GTR_CLICKHOUSE_PASSWORD`
    /// - `GTR_CLICKHOUSE_TABLE` (default: "tweets")
    /// - `GTR_CLICKHOUSE_TLS_CA`, `GTR_CLICKHOUSE_TLS_CERT`, `GTR_CLICKHOUSE_TLS_KEY`
    pub fn from_env() -> Result<Self> {
        let twitter = TwitterConfig {
            access_token: env_or_default("GTR_TWITTER_ACCESS_TOKEN"),
            access_secret: env_or_default("GTR_TWITTER_ACCESS_SECRET"),
            consumer_key: env_or_default("GTR_TWITTER_CONSUMER_KEY"),
            consumer_secret: env_or_default("GTR_TWITTER_CONSUMER_SECRET"),
            api_url: env_or("GTR_TWITTER_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            stream_url: env_or("GTR_TWITTER_STREAM_URL", DEFAULT_STREAM_URL)
                .trim_end_matches('/')
                .to_string(),
        };

        let port = match std::env::var("GTR_CLICKHOUSE_PORT") {
            Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<u16>().map_err(|e| {
                Error::Config(format!("GTR_CLICKHOUSE_PORT must be a port number, got {raw:?}: {e}"))
            })?,
            _ => StoreConfig::default().port,
        };

        let defaults = StoreConfig::default();
        let store = StoreConfig {
            host: env_or("GTR_CLICKHOUSE_HOST", &defaults.host),
            port,
            database: env_or("GTR_CLICKHOUSE_DATABASE", &defaults.database),
            username: env_or("GTR_CLICKHOUSE_USERNAME", &defaults.username),
            password: env_or_default("GTR_CLICKHOUSE_PASSWORD"),
            tls: TlsPaths {
                ca: env_path("GTR_CLICKHOUSE_TLS_CA"),
                cert: env_path("GTR_CLICKHOUSE_TLS_CERT"),
                key: env_path("GTR_CLICKHOUSE_TLS_KEY"),
            },
        };

        let config = Self {
            twitter,
            track: env_or_default("GTR_TWITTER_TRACK"),
            store,
            table: env_or("GTR_CLICKHOUSE_TABLE", "tweets"),
        };

        tracing::debug!(
            track = %config.track,
            store_url = %config.store.url(),
            database = %config.store.database,
            table = %config.table,
            username = %config.store.username,
            tls_ca = ?config.store.tls.ca,
            tls_cert = ?config.store.tls.cert,
            tls_key = ?config.store.tls.key,
            "configuration loaded"
        );

        Ok(config)
    }
}

fn env_or_default(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<empty>" } else { "<redacted>" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize config tests that manipulate env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "GTR_TWITTER_ACCESS_TOKEN",
        "GTR_TWITTER_ACCESS_SECRET",
        "GTR_TWITTER_CONSUMER_KEY",
        "GTR_TWITTER_CONSUMER_SECRET",
        "GTR_TWITTER_TRACK",
        "GTR_TWITTER_API_URL",
        "GTR_TWITTER_STREAM_URL",
        "GTR_CLICKHOUSE_HOST",
        "GTR_CLICKHOUSE_PORT",
        "GTR_CLICKHOUSE_DATABASE",
        "GTR_CLICKHOUSE_USERNAME",
        "GTR_CLICKHOUSE_PASSWORD",
        "GTR_CLICKHOUSE_TABLE",
        "GTR_CLICKHOUSE_TLS_CA",
        "GTR_CLICKHOUSE_TLS_CERT",
        "GTR_CLICKHOUSE_TLS_KEY",
    ];

    /// Helper to run config tests with isolated env vars.
    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap();

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: Serialized by mutex; only test code touches these vars.
        unsafe {
            for k in ENV_KEYS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: Restoring original env state.
        unsafe {
            for (k, v) in &saved {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn config_defaults() {
        with_env_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.track, "");
            assert_eq!(config.table, "tweets");
            assert_eq!(config.twitter.api_url, DEFAULT_API_URL);
            assert_eq!(config.twitter.stream_url, DEFAULT_STREAM_URL);
            assert!(config.twitter.access_token.is_empty());
            assert_eq!(config.store.host, "localhost");
            assert_eq!(config.store.port, 8123);
            assert_eq!(config.store.database, "gtrchive");
            assert_eq!(config.store.username, "default");
            assert_eq!(config.store.tls, TlsPaths::default());
            assert_eq!(config.store.url(), "http://localhost:8123");
        });
    }

    #[test]
    fn config_custom_values() {
        with_env_vars(
            &[
                ("GTR_TWITTER_ACCESS_TOKEN", "at"),
                ("GTR_TWITTER_ACCESS_SECRET", "as"),
                ("GTR_TWITTER_CONSUMER_KEY", "ck"),
                ("GTR_TWITTER_CONSUMER_SECRET", "cs"),
                ("GTR_TWITTER_TRACK", "rust,tokio"),
                ("GTR_CLICKHOUSE_HOST", "ch.internal"),
                ("GTR_CLICKHOUSE_PORT", "8443"),
                ("GTR_CLICKHOUSE_DATABASE", "archive"),
                ("GTR_CLICKHOUSE_USERNAME", "ingest"),
                ("GTR_CLICKHOUSE_PASSWORD", "hunter2"),
                ("GTR_CLICKHOUSE_TABLE", "statuses"),
                ("GTR_CLICKHOUSE_TLS_CA", "/tls/ca.pem"),
                ("GTR_CLICKHOUSE_TLS_CERT", "/tls/client.pem"),
                ("GTR_CLICKHOUSE_TLS_KEY", "/tls/client-key.pem"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.twitter.access_token, "at");
                assert_eq!(config.twitter.consumer_secret, "cs");
                assert_eq!(config.track, "rust,tokio");
                assert_eq!(config.store.port, 8443);
                assert_eq!(config.store.database, "archive");
                assert_eq!(config.store.password, "hunter2");
                assert_eq!(config.table, "statuses");
                assert_eq!(config.store.tls.key, Some(PathBuf::from("/tls/client-key.pem")));
                assert_eq!(config.store.url(), "https://ch.internal:8443");
            },
        );
    }

    #[test]
    fn config_track_is_not_trimmed_or_defaulted() {
        with_env_vars(&[("GTR_TWITTER_TRACK", " rust ")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.track, " rust ");
        });
    }

    #[test]
    fn config_empty_tls_paths_are_absent() {
        with_env_vars(
            &[
                ("GTR_CLICKHOUSE_TLS_CA", ""),
                ("GTR_CLICKHOUSE_TLS_CERT", ""),
                ("GTR_CLICKHOUSE_TLS_KEY", ""),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.store.tls, TlsPaths::default());
                assert!(!config.store.tls.is_configured());
            },
        );
    }

    #[test]
    fn config_cert_without_ca_is_plaintext() {
        with_env_vars(&[("GTR_CLICKHOUSE_TLS_CERT", "/tls/client.pem")], || {
            let config = Config::from_env().unwrap();
            assert!(!config.store.tls.is_configured());
            assert!(config.store.url().starts_with("http://"));
        });
    }

    #[test]
    fn config_invalid_port() {
        with_env_vars(&[("GTR_CLICKHOUSE_PORT", "eighty")], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, Error::Config(_)));
            assert!(err.to_string().contains("GTR_CLICKHOUSE_PORT"));
        });
    }

    #[test]
    fn config_base_urls_trailing_slash_stripped() {
        with_env_vars(
            &[
                ("GTR_TWITTER_API_URL", "http://127.0.0.1:9000/1.1/"),
                ("GTR_TWITTER_STREAM_URL", "http://127.0.0.1:9001/1.1/"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.twitter.api_url, "http://127.0.0.1:9000/1.1");
                assert_eq!(config.twitter.stream_url, "http://127.0.0.1:9001/1.1");
            },
        );
    }

    #[test]
    fn config_debug_redacts_secrets() {
        let store = StoreConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let twitter = TwitterConfig {
            consumer_secret: "s3cret".to_string(),
            ..Default::default()
        };
        let rendered = format!("{store:?} {twitter:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
