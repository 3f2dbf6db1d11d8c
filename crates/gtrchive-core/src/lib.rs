//! Core types and shared utilities for the gtrchive ingestion daemon.
//!
//! This crate provides:
//! - The [`StreamMessage`] taxonomy for lines of the filtered stream
//! - Prometheus metrics helpers
//! - Shared error types

mod error;
pub mod message;
pub mod metrics;

pub use error::{Error, Result};
pub use message::{
    DisconnectNotice, LimitNotice, LocationDeletion, StallWarning, StatusDeletion, StreamMessage,
    Tweet,
};
