//! Document storage for content records.
//!
//! - [`RecordStore`] - the seam the pipeline writes through
//! - [`ClickHouseStore`] - ClickHouse backend, optionally over mutual TLS
//! - [`ensure_schema`] - best-effort database and table creation
//!
//! # Architecture
//!
//! ```text
//! [TlsPaths] → build_client_tls → ClickHouseStore::connect → ensure_schema → insert...
//! ```

mod clickhouse;

pub use clickhouse::{ClickHouseStore, DocumentRow};

use crate::Result;
use async_trait::async_trait;
use gtrchive_core::Tweet;

/// A store that accepts one JSON document per content record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the configured database. Fails if it already exists.
    async fn create_database(&self) -> Result<()>;

    /// Create the records table. Fails if it already exists.
    async fn create_table(&self, table: &str) -> Result<()>;

    /// Write one content record as the provider sent it.
    async fn insert(&self, table: &str, record: &Tweet) -> Result<()>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn create_database(&self) -> Result<()> {
        (**self).create_database().await
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        (**self).create_table(table).await
    }

    async fn insert(&self, table: &str, record: &Tweet) -> Result<()> {
        (**self).insert(table, record).await
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for &S {
    async fn create_database(&self) -> Result<()> {
        (**self).create_database().await
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        (**self).create_table(table).await
    }

    async fn insert(&self, table: &str, record: &Tweet) -> Result<()> {
        (**self).insert(table, record).await
    }
}

/// Attempt to create the database and the records table.
///
/// Both steps are expected to fail once the schema exists. Failures are
/// logged and never returned; the cause is not inspected.
pub async fn ensure_schema<S: RecordStore + ?Sized>(store: &S, table: &str) {
    if let Err(e) = store.create_database().await {
        tracing::error!("Unable to create database: {}", e);
    }

    if let Err(e) = store.create_table(table).await {
        tracing::error!("Unable to create table {}: {}", table, e);
    }
}
