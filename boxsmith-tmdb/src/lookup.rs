//! Cached, retrying resolution of movie ids to canonical collections.
//!
//! Resolution order for a movie id:
//! 1. The persistent cache (`movie/<id>`). A complete payload answers
//!    without touching the network.
//! 2. `GET /movie/{id}` for the collection stub.
//! 3. `GET /collection/{id}`, memoized for the rest of the run so sibling
//!    movies share one fetch.
//!
//! Whatever was fetched is written back as a single cache entry. Failures
//! degrade to [`Lookup::Failed`] for that id; the run carries on.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use boxsmith_core::{
    CacheKey, CacheStore, CollectionProvider, ExternalId, Lookup, RetryPolicy, ServiceError,
    with_retry,
};

use crate::types::{CollectionRecord, MovieRecord, ResolvedPayload};

/// The two catalog calls the lookup client needs.
#[allow(async_fn_in_trait)]
pub trait CatalogApi {
    async fn movie(&self, id: ExternalId) -> Result<MovieRecord, ServiceError>;

    async fn collection(&self, id: ExternalId) -> Result<CollectionRecord, ServiceError>;
}

impl<T: CatalogApi + ?Sized> CatalogApi for &T {
    async fn movie(&self, id: ExternalId) -> Result<MovieRecord, ServiceError> {
        (**self).movie(id).await
    }

    async fn collection(&self, id: ExternalId) -> Result<CollectionRecord, ServiceError> {
        (**self).collection(id).await
    }
}

pub struct LookupClient<A, C> {
    api: A,
    cache: C,
    retry: RetryPolicy,
    collections: Mutex<HashMap<ExternalId, CollectionRecord>>,
}

impl<A: CatalogApi, C: CacheStore> LookupClient<A, C> {
    pub fn new(api: A, cache: C) -> Self {
        Self {
            api,
            cache,
            retry: RetryPolicy::default(),
            collections: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn cached(&self, id: ExternalId) -> Option<ResolvedPayload> {
        let entry = self.cache.get(&CacheKey::Movie(id))?;
        match serde_json::from_value::<ResolvedPayload>(entry.payload) {
            Ok(payload) if payload.movie.id == id => Some(payload),
            Ok(_) => {
                log::debug!("Cache entry movie/{} has a mismatched id, ignoring", id);
                None
            }
            Err(e) => {
                log::debug!("Cache entry movie/{} is unreadable ({}), ignoring", id, e);
                None
            }
        }
    }

    fn store(&self, payload: &ResolvedPayload) {
        let key = CacheKey::Movie(payload.movie.id);
        let result = serde_json::to_value(payload)
            .map_err(boxsmith_core::CacheError::from)
            .and_then(|value| self.cache.put(&key, value));
        if let Err(e) = result {
            log::warn!("Failed to write cache entry {}: {}", key, e);
        }
    }

    async fn fetch_collection(&self, id: ExternalId) -> Result<CollectionRecord, ServiceError> {
        if let Some(hit) = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(hit.clone());
        }

        let label = format!("TMDb collection {id}");
        let record = with_retry(&self.retry, &label, || self.api.collection(id)).await?;
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, record.clone());
        Ok(record)
    }
}

impl<A: CatalogApi, C: CacheStore> CollectionProvider for LookupClient<A, C> {
    async fn resolve(&self, id: ExternalId) -> Lookup {
        let (mut payload, mut dirty) = match self.cached(id) {
            Some(payload) => (payload, false),
            None => {
                let label = format!("TMDb movie {id}");
                match with_retry(&self.retry, &label, || self.api.movie(id)).await {
                    Ok(movie) => (
                        ResolvedPayload {
                            movie,
                            collection: None,
                        },
                        true,
                    ),
                    Err(ServiceError::NotFound) => {
                        log::debug!("TMDb has no movie {}", id);
                        return Lookup::NotFound;
                    }
                    Err(e) => {
                        log::warn!("Lookup failed for TMDb movie {}: {}", id, e);
                        return Lookup::Failed(e.to_string());
                    }
                }
            }
        };

        let Some(stub) = payload.movie.collection.clone() else {
            if dirty {
                self.store(&payload);
            }
            return Lookup::NoCollection;
        };

        if !payload.is_complete() {
            match self.fetch_collection(stub.id).await {
                Ok(record) => {
                    payload.collection = Some(record);
                    dirty = true;
                }
                Err(e) => {
                    // Keep the movie half so the next run only refetches the collection.
                    if dirty {
                        self.store(&payload);
                    }
                    if e == ServiceError::NotFound {
                        log::warn!("TMDb collection {} (from movie {}) not found", stub.id, id);
                        return Lookup::NotFound;
                    }
                    log::warn!("Lookup failed for TMDb collection {}: {}", stub.id, e);
                    return Lookup::Failed(e.to_string());
                }
            }
        }

        if dirty {
            self.store(&payload);
        }

        match &payload.collection {
            Some(record) => Lookup::Found(record.to_canonical()),
            None => Lookup::NoCollection,
        }
    }
}

#[cfg(test)]
#[path = "tests/lookup_tests.rs"]
mod tests;
