//! In-memory entity cache
//!
//! This module provides a cache manager that keeps decoded entities by
//! identifier with a configurable time-to-live. Expired entries are removed by
//! a sweep (on demand or on a background interval), never by reads, so a read
//! may briefly return an entry that is already past its time-to-live.

mod manager;
mod sweep;

pub use manager::{CacheConfig, CacheManager, Entity, EntryMetadata, Expiry, Snapshot};
pub use sweep::{SweepHandle, SweepReport};
