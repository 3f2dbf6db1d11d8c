//! The ingestion loop: one insert per content record, nothing else.

use crate::store::RecordStore;
use crate::stream::Subscription;
use gtrchive_core::StreamMessage;

/// Default number of messages between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

/// Counters for one run of the ingestion loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Messages received, of any kind.
    pub messages: u64,
    /// Content records (tweets) received.
    pub tweets: u64,
    /// Content records written to the store.
    pub inserted: u64,
    /// Content records the store refused.
    pub insert_errors: u64,
    /// Non-content messages discarded.
    pub ignored: u64,
}

/// Drains a subscription into a store.
pub struct Ingestor<S> {
    store: S,
    table: String,
    progress_interval: u64,
}

impl<S: RecordStore> Ingestor<S> {
    pub fn new(store: S, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Consume messages in delivery order until the subscription ends.
    ///
    /// Each tweet is inserted exactly once; a failed insert is logged and the
    /// record dropped. Every other message kind is discarded. One insert is in
    /// flight at a time.
    #[tracing::instrument(name = "ingest", skip_all, fields(table = %self.table))]
    pub async fn run(&self, mut subscription: Subscription) -> IngestStats {
        let mut stats = IngestStats::default();
        metrics::gauge!("ingestion_running").set(1.0);
        tracing::info!("Ingestion started");

        while let Some(message) = subscription.next().await {
            stats.messages += 1;
            metrics::counter!("ingest_messages_total", "kind" => message.kind()).increment(1);

            match message {
                StreamMessage::Tweet(tweet) => {
                    stats.tweets += 1;
                    metrics::counter!("ingest_tweets_total").increment(1);
                    tracing::debug!("{:<15}: {}", tweet.screen_name(), tweet.text());

                    match self.store.insert(&self.table, &tweet).await {
                        Ok(()) => {
                            stats.inserted += 1;
                            metrics::counter!("ingest_inserts_total").increment(1);
                        }
                        Err(e) => {
                            stats.insert_errors += 1;
                            metrics::counter!("ingest_insert_errors_total").increment(1);
                            tracing::error!(
                                "Unable to insert tweet {}: {}",
                                tweet.id_str().unwrap_or("<no id>"),
                                e
                            );
                        }
                    }
                }
                other => {
                    stats.ignored += 1;
                    metrics::counter!("ingest_messages_ignored_total").increment(1);
                    tracing::trace!("Ignoring {} message", other.kind());
                }
            }

            if stats.messages.is_multiple_of(self.progress_interval) {
                tracing::info!(
                    "Progress: {} messages, {} tweets, {} inserted, {} insert errors",
                    stats.messages,
                    stats.tweets,
                    stats.inserted,
                    stats.insert_errors
                );
            }
        }

        metrics::gauge!("ingestion_running").set(0.0);
        tracing::info!(
            "Subscription ended after {} messages ({} inserted, {} insert errors, {} ignored)",
            stats.messages,
            stats.inserted,
            stats.insert_errors,
            stats.ignored
        );

        stats
    }
}
