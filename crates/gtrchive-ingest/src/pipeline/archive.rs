//! Startup sequence: schema, credentials, subscription, ingestion.

use super::ingest::{IngestStats, Ingestor};
use crate::store::{RecordStore, ensure_schema};
use crate::stream::StreamProvider;
use crate::{Error, Result};

/// What to subscribe to and where to write it.
#[derive(Debug, Clone)]
pub struct ArchiverConfig {
    /// Track filter, sent to the provider exactly as given.
    pub track: String,
    /// Table receiving one row per content record.
    pub table: String,
}

/// Wires a stream provider to a record store.
pub struct Archiver<P, S> {
    provider: P,
    store: S,
    config: ArchiverConfig,
}

impl<P: StreamProvider, S: RecordStore> Archiver<P, S> {
    pub fn new(provider: P, store: S, config: ArchiverConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Run until the subscription ends.
    ///
    /// Schema creation and credential verification run concurrently. Schema
    /// failures are only logged; a credential failure aborts before any
    /// subscription is opened.
    pub async fn run(self) -> Result<IngestStats> {
        let (_, verified) = tokio::join!(
            ensure_schema(&self.store, &self.config.table),
            self.provider.verify_credentials()
        );

        match verified {
            Ok(true) => {}
            Ok(false) => {
                return Err(Error::InvalidCredentials(
                    "the provider rejected the configured credentials".to_string(),
                ));
            }
            Err(e) => return Err(Error::InvalidCredentials(e.to_string())),
        }

        let subscription = self.provider.subscribe(&self.config.track).await?;

        let stats = Ingestor::new(self.store, self.config.table)
            .run(subscription)
            .await;
        Ok(stats)
    }
}
