//! gtrchive ingestion daemon components.
//!
//! This crate archives a filtered real-time tweet stream into ClickHouse,
//! one row per tweet, with the document stored exactly as received.
//!
//! # Modules
//!
//! - [`config`] - environment-driven configuration
//! - [`tls`] - mutual-TLS client configuration for the store connection
//! - [`store`] - record storage (ClickHouse) and schema bootstrap
//! - [`stream`] - OAuth-signed stream client and subscriptions
//! - [`pipeline`] - the startup sequence and the ingestion loop
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  TwitterClient  │  statuses/filter.json, reconnect + back-off
//! └────────┬────────┘
//!          │ Subscription (bounded channel)
//!          ▼
//! ┌─────────────────┐
//! │    Ingestor     │  tweets only, one insert at a time
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ClickHouseStore │  verbatim JSON, optional mTLS
//! └─────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod stream;
pub mod tls;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

pub use config::{Config, StoreConfig, TlsPaths, TwitterConfig};
pub use pipeline::{Archiver, ArchiverConfig, IngestStats, Ingestor};
pub use store::{ClickHouseStore, RecordStore, ensure_schema};
pub use stream::{StreamProvider, Subscription, TwitterClient};
pub use tls::build_client_tls;
