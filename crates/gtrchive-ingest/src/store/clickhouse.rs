//! ClickHouse document store.
//!
//! Each content record becomes one row holding the JSON text exactly as the
//! provider sent it:
//!
//! ```sql
//! CREATE TABLE tweets (
//!     received_at DateTime64(3, 'UTC') DEFAULT now64(3),
//!     doc String
//! ) ENGINE = MergeTree ORDER BY received_at
//! ```
//!
//! When mutual TLS is configured the HTTP client is a hyper client over a
//! rustls connector built from the caller's [`rustls::ClientConfig`];
//! otherwise the crate's default plain HTTP client is used.

use super::RecordStore;
use crate::config::StoreConfig;
use crate::tls::build_client_tls;
use crate::Result;
use async_trait::async_trait;
use clickhouse::sql::Identifier;
use clickhouse::{Client, Row};
use gtrchive_core::Tweet;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};

/// Row written for each content record. `received_at` is filled server-side.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct DocumentRow {
    pub doc: String,
}

impl From<&Tweet> for DocumentRow {
    fn from(record: &Tweet) -> Self {
        Self {
            doc: record.raw().to_string(),
        }
    }
}

/// Storage connection handle.
///
/// Cloning is cheap; clones share the underlying HTTP connection pool.
#[derive(Clone)]
pub struct ClickHouseStore {
    /// Client without a database context (database creation, health checks).
    admin: Client,
    /// Client scoped to the configured database.
    client: Client,
    database: String,
    tls: bool,
}

impl ClickHouseStore {
    /// Build the store handle from configuration without touching the network.
    ///
    /// Fails if TLS material passes the CA+cert gate but cannot be loaded.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let tls = build_client_tls(&config.tls)?;
        let secured = tls.is_some();

        let base = match tls {
            Some(tls) => {
                let connector = hyper_rustls::HttpsConnectorBuilder::new()
                    .with_tls_config(tls)
                    .https_or_http()
                    .enable_http1()
                    .build();
                let http = hyper_util::client::legacy::Client::builder(TokioExecutor::new())
                    .build(connector);
                Client::with_http_client(http)
            }
            None => Client::default(),
        };

        let admin = base
            .with_url(config.url())
            .with_user(config.username.clone())
            .with_password(config.password.clone());
        let client = admin.clone().with_database(config.database.clone());

        tracing::info!(
            "ClickHouse store initialized: url={}, database={}, tls={}",
            config.url(),
            config.database,
            secured
        );

        Ok(Self {
            admin,
            client,
            database: config.database.clone(),
            tls: secured,
        })
    }

    /// Build the store handle and verify the server is reachable.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let store = Self::from_config(config)?;
        store.health_check().await?;
        Ok(store)
    }

    /// Name of the configured database.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Whether the connection is secured with client TLS.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Run `SELECT 1` outside any database context.
    pub async fn health_check(&self) -> Result<()> {
        let one: u8 = self.admin.query("SELECT 1").fetch_one().await?;
        tracing::debug!("ClickHouse health check returned {}", one);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for ClickHouseStore {
    async fn create_database(&self) -> Result<()> {
        self.admin
            .query("CREATE DATABASE ?")
            .bind(Identifier(&self.database))
            .execute()
            .await?;
        tracing::info!("Created database {}", self.database);
        Ok(())
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        self.client
            .query(
                "CREATE TABLE ? (
                    received_at DateTime64(3, 'UTC') DEFAULT now64(3),
                    doc String
                ) ENGINE = MergeTree ORDER BY received_at",
            )
            .bind(Identifier(table))
            .execute()
            .await?;
        tracing::info!("Created table {}.{}", self.database, table);
        Ok(())
    }

    async fn insert(&self, table: &str, record: &Tweet) -> Result<()> {
        let row = DocumentRow::from(record);

        let mut inserter = self.client.insert(table)?;
        inserter.write(&row).await?;
        inserter.end().await?;

        Ok(())
    }
}
