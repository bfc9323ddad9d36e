//! TMDb catalog access for boxsmith.
//!
//! - [`TmdbClient`]: rate-limited HTTP client for the v3 API and poster CDN
//! - [`LookupClient`]: cached, retrying resolution of movie ids to collections
//! - [`JsonFileCache`]: the persistent cache file
//! - [`SnapshotProvider`]: offline membership from a local dataset

pub mod cache;
pub mod client;
pub mod error;
pub mod lookup;
pub mod provider;
pub mod snapshot;
pub mod types;

pub use cache::{CacheStats, JsonFileCache, clear_cache, default_cache_path};
pub use client::TmdbClient;
pub use error::TmdbError;
pub use lookup::{CatalogApi, LookupClient};
pub use provider::CatalogProvider;
pub use snapshot::SnapshotProvider;
pub use types::{CollectionRecord, MovieRecord, ResolvedPayload};
