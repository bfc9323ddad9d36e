//! Persistent cache capability.
//!
//! The cache is keyed by catalog id and never expires; entries only go away
//! when the cache is cleared. Backends implement [`CacheStore`]; the file
//! backend lives with the catalog client, and [`MemoryCache`] backs tests and
//! `--no-cache` runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::ids::ExternalId;
use crate::types::PosterRef;

/// What a cache entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// Resolved catalog payload for a movie.
    Movie(ExternalId),
    /// The poster last applied to the grouping for a collection.
    Artwork(ExternalId),
}

impl CacheKey {
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Movie(_) => "movie",
            Self::Artwork(_) => "artwork",
        }
    }

    pub fn id(&self) -> ExternalId {
        match self {
            Self::Movie(id) | Self::Artwork(id) => *id,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            fetched_at: Utc::now(),
        }
    }
}

/// Keyed store of catalog payloads, durable across runs for file backends.
///
/// `put` must be safe to call concurrently; payloads are idempotent per key
/// so the last writer winning is fine. Backends may buffer puts until
/// `flush`.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    fn put(&self, key: &CacheKey, payload: serde_json::Value) -> Result<(), CacheError>;

    /// Make every buffered `put` durable.
    fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

impl<T: CacheStore + ?Sized> CacheStore for Arc<T> {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, payload: serde_json::Value) -> Result<(), CacheError> {
        (**self).put(key, payload)
    }

    fn flush(&self) -> Result<(), CacheError> {
        (**self).flush()
    }
}

impl<T: CacheStore + ?Sized> CacheStore for &T {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, payload: serde_json::Value) -> Result<(), CacheError> {
        (**self).put(key, payload)
    }

    fn flush(&self) -> Result<(), CacheError> {
        (**self).flush()
    }
}

/// In-memory cache that counts writes.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    writes: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls made so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &CacheKey, payload: serde_json::Value) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*key, CacheEntry::new(payload));
        Ok(())
    }
}

/// Poster last applied to the grouping for `collection`, if recorded.
pub fn applied_artwork(cache: &dyn CacheStore, collection: ExternalId) -> Option<PosterRef> {
    let entry = cache.get(&CacheKey::Artwork(collection))?;
    entry
        .payload
        .get("poster")
        .and_then(|p| p.as_str())
        .map(|p| PosterRef(p.to_string()))
}

/// Record that `poster` is now the grouping artwork for `collection`.
pub fn record_artwork(
    cache: &dyn CacheStore,
    collection: ExternalId,
    poster: &PosterRef,
) -> Result<(), CacheError> {
    cache.put(
        &CacheKey::Artwork(collection),
        serde_json::json!({ "poster": poster.as_str() }),
    )
}
