//! Shared types and contracts for boxsmith.
//!
//! Everything the reconciliation engine and the service clients agree on
//! lives here: catalog ids, library and catalog models, the run
//! configuration, the service traits, the error taxonomy and the retry
//! policy.

pub mod cache;
pub mod config;
pub mod error;
pub mod ids;
pub mod names;
pub mod retry;
pub mod service;
pub mod types;

pub use cache::{CacheEntry, CacheKey, CacheStore, MemoryCache, applied_artwork, record_artwork};
pub use config::{CatalogMode, ForwardMode, ModeParseError, RunConfig};
pub use error::{CacheError, ServiceError};
pub use ids::{ExternalId, InvalidExternalId};
pub use names::{grouping_name, match_key};
pub use retry::{RetryPolicy, with_retry};
pub use service::{
    ArtworkSource, CollectionProvider, LibraryService, Lookup, NoArtwork, NoRequests, RequestService,
};
pub use types::{
    CanonicalCollection, CollectionMember, CreateRequestOutcome, Grouping, LibraryItem,
    MissingItem, PosterRef, RequestStatus,
};
