//! Contracts for the external collaborators the engine drives.
//!
//! The engine is generic over these traits so every stage can run against
//! in-memory fakes. Futures are not required to be `Send`; the engine polls
//! them on the calling task.

use crate::error::ServiceError;
use crate::ids::ExternalId;
use crate::types::{
    CanonicalCollection, CreateRequestOutcome, Grouping, LibraryItem, PosterRef, RequestStatus,
};

/// The media server that owns the library and its groupings.
#[allow(async_fn_in_trait)]
pub trait LibraryService {
    /// Enumerate movies. With `include_grouped`, items already inside a
    /// grouping are listed individually instead of being folded into it.
    async fn list_items(&self, include_grouped: bool) -> Result<Vec<LibraryItem>, ServiceError>;

    async fn list_groupings(&self) -> Result<Vec<Grouping>, ServiceError>;

    /// Create an empty grouping and return its id.
    async fn create_grouping(&self, name: &str) -> Result<String, ServiceError>;

    async fn add_members(&self, grouping_id: &str, member_ids: &[String]) -> Result<(), ServiceError>;

    async fn set_artwork(&self, grouping_id: &str, image: &[u8]) -> Result<(), ServiceError>;
}

/// Outcome of resolving one catalog id to its canonical collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(CanonicalCollection),
    /// The title exists but belongs to no collection.
    NoCollection,
    /// The catalog does not know the id.
    NotFound,
    /// Retries were exhausted or the response was unusable.
    Failed(String),
}

impl Lookup {
    pub fn into_collection(self) -> Option<CanonicalCollection> {
        match self {
            Self::Found(c) => Some(c),
            _ => None,
        }
    }
}

/// Source of canonical collection membership (live catalog or snapshot).
#[allow(async_fn_in_trait)]
pub trait CollectionProvider {
    async fn resolve(&self, id: ExternalId) -> Lookup;
}

/// Downstream acquisition request service.
#[allow(async_fn_in_trait)]
pub trait RequestService {
    /// Existing request state for the title, or `None` if nobody asked yet.
    async fn find_request(&self, id: ExternalId) -> Result<Option<RequestStatus>, ServiceError>;

    async fn create_request(&self, id: ExternalId) -> Result<CreateRequestOutcome, ServiceError>;

    /// Release year the service has on record for the title.
    async fn release_year(&self, _id: ExternalId) -> Result<Option<i32>, ServiceError> {
        Ok(None)
    }
}

impl<T: RequestService + ?Sized> RequestService for &T {
    async fn find_request(&self, id: ExternalId) -> Result<Option<RequestStatus>, ServiceError> {
        (**self).find_request(id).await
    }

    async fn release_year(&self, id: ExternalId) -> Result<Option<i32>, ServiceError> {
        (**self).release_year(id).await
    }

    async fn create_request(&self, id: ExternalId) -> Result<CreateRequestOutcome, ServiceError> {
        (**self).create_request(id).await
    }
}

/// Fetches artwork bytes for a catalog poster reference.
#[allow(async_fn_in_trait)]
pub trait ArtworkSource {
    async fn fetch_artwork(&self, poster: &PosterRef) -> Result<Vec<u8>, ServiceError>;
}

impl<T: ArtworkSource + ?Sized> ArtworkSource for &T {
    async fn fetch_artwork(&self, poster: &PosterRef) -> Result<Vec<u8>, ServiceError> {
        (**self).fetch_artwork(poster).await
    }
}

/// Artwork source for runs that never apply artwork.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoArtwork;

impl ArtworkSource for NoArtwork {
    async fn fetch_artwork(&self, _poster: &PosterRef) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError::NotFound)
    }
}

/// Request service for runs with forwarding disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRequests;

impl RequestService for NoRequests {
    async fn find_request(&self, _id: ExternalId) -> Result<Option<RequestStatus>, ServiceError> {
        Err(ServiceError::Unauthorized("no request service configured".into()))
    }

    async fn create_request(&self, _id: ExternalId) -> Result<CreateRequestOutcome, ServiceError> {
        Err(ServiceError::Unauthorized("no request service configured".into()))
    }
}
