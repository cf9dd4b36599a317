//! Cache manager for keeping decoded entities in memory
//!
//! Provides a `CacheManager` that stores entities by identifier along with
//! insertion and refresh timestamps, and evicts entries once they outlive the
//! configured time-to-live.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::sweep::SweepHandle;

/// A value that can be cached by identifier
pub trait Entity: Send + Sync + 'static {
    /// Stable identifier, unique within a cache
    fn id(&self) -> &str;
}

/// How long something lasts before it lapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Never lapses; disables the knob it configures
    Never,
    /// Lapses after the given duration
    After(Duration),
}

impl Expiry {
    /// One hour
    pub const HOUR: Expiry = Expiry::After(Duration::from_secs(60 * 60));
    /// One day
    pub const DAY: Expiry = Expiry::After(Duration::from_secs(24 * 60 * 60));

    /// Returns the duration, or `None` for `Never`
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Expiry::Never => None,
            Expiry::After(duration) => Some(*duration),
        }
    }
}

/// Lifetime settings for a cache, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age at which an entry is evicted by the sweep
    pub ttl: Expiry,
    /// Period between background sweeps
    pub update_interval: Expiry,
}

impl CacheConfig {
    /// A cache that keeps entries until they are explicitly removed
    pub fn never_expire() -> Self {
        Self {
            ttl: Expiry::Never,
            update_interval: Expiry::Never,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Expiry::DAY,
            update_interval: Expiry::HOUR,
        }
    }
}

/// Stored entity plus bookkeeping
#[derive(Debug)]
struct CacheEntry<E> {
    value: Arc<E>,
    /// Position in insertion order
    seq: u64,
    inserted_at: DateTime<Utc>,
    last_refreshed_at: DateTime<Utc>,
}

/// Timestamps recorded for a cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// When the entry was first stored
    pub inserted_at: DateTime<Utc>,
    /// When the entry's value was last replaced
    pub last_refreshed_at: DateTime<Utc>,
}

/// Insertion-ordered map from identifier to entry
#[derive(Debug)]
pub(crate) struct CacheStore<E> {
    entries: HashMap<String, CacheEntry<E>>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<E> CacheStore<E> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    fn insert(&mut self, id: String, value: Arc<E>, now: DateTime<Utc>, keep_inserted_at: bool) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.value = value;
            entry.last_refreshed_at = now;
            if !keep_inserted_at {
                entry.inserted_at = now;
            }
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id.clone());
        self.entries.insert(
            id,
            CacheEntry {
                value,
                seq,
                inserted_at: now,
                last_refreshed_at: now,
            },
        );
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                self.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Entries in insertion order
    fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry<E>)> {
        self.order
            .values()
            .filter_map(move |id| self.entries.get(id).map(|entry| (id, entry)))
    }

    /// Evicts entries whose age has reached `ttl`, returning the evicted ids
    pub(crate) fn evict_older_than(&mut self, ttl: Duration, now: DateTime<Utc>) -> Vec<String> {
        // A ttl beyond chrono's range can never be reached.
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return Vec::new();
        };
        let expired: Vec<String> = self
            .iter()
            .filter(|(_, entry)| now.signed_duration_since(entry.inserted_at) >= ttl)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.remove(id);
        }
        expired
    }
}

/// Point-in-time copy of part of the cache
///
/// Taken under the store lock, so later writes are never observed. Iterate it
/// as many times as needed.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    items: Vec<T>,
}

impl<T> Snapshot<T> {
    /// Iterates the snapshot from the start
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Number of items captured
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> IntoIterator for Snapshot<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Snapshot<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Keeps entities in memory, keyed by identifier
///
/// Reads never touch the network and never check expiration: an entry older
/// than `ttl` remains readable until the next sweep removes it. All access goes
/// through one lock, which is never held across an await point.
#[derive(Debug)]
pub struct CacheManager<E> {
    config: CacheConfig,
    store: Arc<RwLock<CacheStore<E>>>,
}

impl<E: Entity> CacheManager<E> {
    /// Creates an empty cache with the given lifetime settings
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            store: Arc::new(RwLock::new(CacheStore::new())),
        }
    }

    /// Returns the lifetime settings
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    pub fn get(&self, id: &str) -> Option<Arc<E>> {
        self.store.read().entries.get(id).map(|entry| entry.value.clone())
    }

    pub fn has(&self, id: &str) -> bool {
        self.store.read().entries.contains_key(id)
    }

    /// Inserts or replaces an entity, resetting both of its timestamps
    pub fn set(&self, entity: E) -> Arc<E> {
        let value = Arc::new(entity);
        let id = value.id().to_string();
        self.store.write().insert(id, value.clone(), Utc::now(), false);
        value
    }

    /// Stores a freshly fetched entity
    ///
    /// A new id is inserted as with `set`. An existing id gets the new value and
    /// a new `last_refreshed_at`, but keeps its `inserted_at`, so a refetch does
    /// not extend its time-to-live.
    pub(crate) fn insert_fetched(&self, entity: E) -> Arc<E> {
        let value = Arc::new(entity);
        let id = value.id().to_string();
        self.store.write().insert(id, value.clone(), Utc::now(), true);
        value
    }

    /// Removes one entry, returning whether it was present
    pub fn delete(&self, id: &str) -> bool {
        self.store.write().remove(id)
    }

    pub fn clear(&self) {
        self.store.write().clear();
    }

    /// Identifiers in insertion order
    pub fn keys(&self) -> Snapshot<String> {
        let store = self.store.read();
        Snapshot {
            items: store.iter().map(|(id, _)| id.clone()).collect(),
        }
    }

    /// Entities in insertion order
    pub fn values(&self) -> Snapshot<Arc<E>> {
        let store = self.store.read();
        Snapshot {
            items: store.iter().map(|(_, entry)| entry.value.clone()).collect(),
        }
    }

    /// Identifier and entity pairs in insertion order
    pub fn entries(&self) -> Snapshot<(String, Arc<E>)> {
        let store = self.store.read();
        Snapshot {
            items: store
                .iter()
                .map(|(id, entry)| (id.clone(), entry.value.clone()))
                .collect(),
        }
    }

    /// Number of live entries
    pub fn size(&self) -> usize {
        self.store.read().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Timestamps recorded for an entry
    pub fn entry_metadata(&self, id: &str) -> Option<EntryMetadata> {
        self.store.read().entries.get(id).map(|entry| EntryMetadata {
            inserted_at: entry.inserted_at,
            last_refreshed_at: entry.last_refreshed_at,
        })
    }

    /// Evicts every entry whose age has reached the time-to-live
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Evicts every entry that is at least `ttl` old as of `now`
    ///
    /// Returns the number of entries removed. With `ttl = Never` nothing is
    /// removed. Expired entries are dropped, never refetched.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.config.ttl.duration() else {
            return 0;
        };

        let evicted = self.store.write().evict_older_than(ttl, now);
        if !evicted.is_empty() {
            debug!(count = evicted.len(), ids = ?evicted, "evicted expired cache entries");
        }
        evicted.len()
    }

    /// Starts sweeping in the background every `update_interval`
    ///
    /// Returns `None` when either the update interval or the time-to-live is
    /// `Never`, or when the update interval is zero. Must be called from within
    /// a tokio runtime.
    pub fn spawn_sweeper(&self) -> Option<SweepHandle> {
        let interval = self.config.update_interval.duration()?;
        let ttl = self.config.ttl.duration()?;
        if interval.is_zero() {
            warn!("zero update interval, background sweep disabled");
            return None;
        }
        Some(SweepHandle::spawn(Arc::downgrade(&self.store), ttl, interval))
    }
}
