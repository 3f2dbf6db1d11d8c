//! Error types for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum Error {
    /// TLS material could not be read from disk.
    #[error("unable to read {what} at {}: {source}", path.display())]
    TlsMaterial {
        /// Which piece of material (CA certificate, client certificate, ...).
        what: &'static str,
        /// Path that was dereferenced.
        path: PathBuf,
        /// Underlying PEM or I/O failure.
        source: rustls::pki_types::pem::Error,
    },

    /// TLS material was read but is unusable.
    #[error("TLS error: {0}")]
    Tls(String),

    /// rustls rejected the configuration (bad key pair, unsupported key type).
    #[error("rustls error: {0}")]
    Rustls(#[from] rustls::Error),

    /// ClickHouse error.
    #[error("ClickHouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    /// HTTP transport error talking to the stream provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The stream provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Credential verification failed or could not be performed.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
