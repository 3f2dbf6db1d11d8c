//! The archiving pipeline.
//!
//! - [`Archiver`] - startup sequence: schema, credentials, subscription
//! - [`Ingestor`] - drains a subscription into the store
//!
//! # Architecture
//!
//! ```text
//! ensure_schema ─┐
//!                ├─▶ subscribe(track) ─▶ [Ingestor] ─▶ RecordStore::insert
//! verify creds ──┘
//! ```
//!
//! Only content records are stored. Deletions, limits, warnings and every
//! other control message are discarded.

mod archive;
mod ingest;

pub use archive::{Archiver, ArchiverConfig};
pub use ingest::{DEFAULT_PROGRESS_INTERVAL, IngestStats, Ingestor};
