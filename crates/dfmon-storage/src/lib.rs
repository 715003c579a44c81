//! Durable cache for host status and disk usage.
//!
//! [`cache::CacheStore`] wraps a single SQLite database with two tables,
//! `hosts` and `disk_usage`. Timestamps are maintained by triggers, and every
//! statement runs through a bounded-retry wrapper so short lock contention
//! from a concurrent run is absorbed.

pub mod cache;
pub mod error;
pub mod schema;


pub use cache::{CacheStore, DiskUsageRow, DiskUsageUpsert, HostOutcome, HostRow, Upserted};
pub use error::{Result, StorageError};
