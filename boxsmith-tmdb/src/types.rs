//! TMDb response shapes and the filtered records stored in the cache.
//!
//! Only the fields the reconciler needs are kept. The cached form
//! ([`ResolvedPayload`]) embeds the movie together with its collection so a
//! resolution produces exactly one cache entry.

use boxsmith_core::{CanonicalCollection, CollectionMember, ExternalId, PosterRef};
use serde::{Deserialize, Serialize};

/// Response from `GET /movie/{id}`.
#[derive(Debug, Deserialize)]
pub struct MovieResponse {
    pub id: ExternalId,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub status: Option<String>,
    pub belongs_to_collection: Option<CollectionRef>,
    pub poster_path: Option<String>,
}

/// The `belongs_to_collection` stub embedded in a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: ExternalId,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response from `GET /collection/{id}`.
#[derive(Debug, Deserialize)]
pub struct CollectionResponse {
    pub id: ExternalId,
    pub name: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
pub struct PartResponse {
    #[serde(default)]
    pub id: Option<ExternalId>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
}

/// Response from `GET /configuration`. Only used to validate the key.
#[derive(Debug, Deserialize)]
pub struct ConfigurationResponse {
    #[serde(default)]
    pub images: Option<serde_json::Value>,
}

/// Filtered movie record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: ExternalId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "belongs_to_collection")]
    pub collection: Option<CollectionRef>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl From<MovieResponse> for MovieRecord {
    fn from(r: MovieResponse) -> Self {
        Self {
            id: r.id,
            title: r.title.or(r.original_title),
            release_date: r.release_date.filter(|d| !d.is_empty()),
            status: r.status,
            collection: r.belongs_to_collection,
            poster_path: r.poster_path,
        }
    }
}

/// Filtered collection member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    pub id: ExternalId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Filtered collection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: ExternalId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartRecord>,
}

impl From<CollectionResponse> for CollectionRecord {
    fn from(r: CollectionResponse) -> Self {
        let parts = r
            .parts
            .into_iter()
            .filter_map(|p| {
                Some(PartRecord {
                    id: p.id?,
                    title: p.title.or(p.original_title),
                    release_date: p.release_date.filter(|d| !d.is_empty()),
                })
            })
            .collect();
        Self {
            id: r.id,
            name: r.name,
            poster_path: r.poster_path,
            parts,
        }
    }
}

impl CollectionRecord {
    /// Convert into the engine's model. Members keep catalog order; a part
    /// listed twice is kept once.
    pub fn to_canonical(&self) -> CanonicalCollection {
        let mut members: Vec<CollectionMember> = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            if members.iter().any(|m| m.id == part.id) {
                continue;
            }
            members.push(CollectionMember {
                id: part.id,
                title: part.title.clone().unwrap_or_default(),
                release_date: part.release_date.clone(),
            });
        }
        CanonicalCollection {
            id: self.id,
            name: self
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("Collection {}", self.id)),
            members,
            poster: self
                .poster_path
                .clone()
                .filter(|p| !p.is_empty())
                .map(PosterRef),
        }
    }
}

/// What the lookup client caches for a movie id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPayload {
    pub movie: MovieRecord,
    /// Present once the movie's collection has been fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionRecord>,
}

impl ResolvedPayload {
    /// A payload is complete when nothing more needs fetching for it.
    pub fn is_complete(&self) -> bool {
        match (&self.movie.collection, &self.collection) {
            (None, _) => true,
            (Some(r), Some(c)) => r.id == c.id,
            (Some(_), None) => false,
        }
    }
}
