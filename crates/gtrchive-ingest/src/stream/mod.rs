//! Credentialed access to the filtered event stream.
//!
//! - [`StreamProvider`] - credential verification and subscription, the seam
//!   the pipeline depends on
//! - [`TwitterClient`] - OAuth 1.0a client for the v1.1 streaming API
//! - [`Subscription`] - the consumer end of a running subscription
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   bounded mpsc   ┌──────────────────┐
//! │ producer task    │ ───────────────▶ │ Subscription     │
//! │ (HTTP, reconnect)│  StreamMessage   │ (ingestion loop) │
//! └──────────────────┘                  └──────────────────┘
//! ```
//!
//! The producer owns the HTTP connection and all reconnect logic. The
//! consumer only ever awaits the next message.

mod backoff;
mod oauth;
mod twitter;

pub use backoff::{Backoff, BackoffPolicy, ReconnectReason};
pub use oauth::{Credentials, Signer, percent_encode, signature_base_string};
pub use twitter::{DEFAULT_MAX_LINE, LineSplitter, StreamOptions, TwitterClient};

use crate::Result;
use async_trait::async_trait;
use gtrchive_core::StreamMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A provider of filtered event streams.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Round-trip the credentials. `Ok(false)` means the provider rejected them.
    async fn verify_credentials(&self) -> Result<bool>;

    /// Open a long-lived subscription for the given track filter.
    ///
    /// The filter is sent exactly as given.
    async fn subscribe(&self, track: &str) -> Result<Subscription>;
}

#[async_trait]
impl<P: StreamProvider + ?Sized> StreamProvider for std::sync::Arc<P> {
    async fn verify_credentials(&self) -> Result<bool> {
        (**self).verify_credentials().await
    }

    async fn subscribe(&self, track: &str) -> Result<Subscription> {
        (**self).subscribe(track).await
    }
}

/// Consumer end of a subscription.
///
/// Messages arrive in provider order. The sequence ends when the producer
/// stops for good; it cannot be restarted. Dropping the subscription stops
/// the producer.
pub struct Subscription {
    receiver: mpsc::Receiver<StreamMessage>,
    producer: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a receiver and the task feeding it.
    pub fn new(receiver: mpsc::Receiver<StreamMessage>, producer: Option<JoinHandle<()>>) -> Self {
        Self { receiver, producer }
    }

    /// Create a subscription fed by the returned sender, with no owned task.
    pub fn channel(capacity: usize) -> (mpsc::Sender<StreamMessage>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(receiver, None))
    }

    /// Wait for the next message. `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<StreamMessage> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("has_producer", &self.producer.is_some())
            .finish()
    }
}
