use boxsmith_core::{
    ArtworkSource, CacheStore, CollectionProvider, ExternalId, Lookup, PosterRef, ServiceError,
};

use crate::client::TmdbClient;
use crate::lookup::LookupClient;
use crate::snapshot::SnapshotProvider;

/// The catalog chosen for a run: live TMDb lookups or the offline snapshot.
pub enum CatalogProvider<C> {
    Live(LookupClient<TmdbClient, C>),
    Snapshot(SnapshotProvider),
}

impl<C: CacheStore> CollectionProvider for CatalogProvider<C> {
    async fn resolve(&self, id: ExternalId) -> Lookup {
        match self {
            Self::Live(client) => client.resolve(id).await,
            Self::Snapshot(snapshot) => snapshot.resolve(id).await,
        }
    }
}

impl<C: CacheStore> ArtworkSource for CatalogProvider<C> {
    async fn fetch_artwork(&self, poster: &PosterRef) -> Result<Vec<u8>, ServiceError> {
        match self {
            Self::Live(client) => client.api().fetch_artwork(poster).await,
            Self::Snapshot(_) => Err(ServiceError::NotFound),
        }
    }
}
