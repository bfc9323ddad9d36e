use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::ExternalId;

/// A movie as enumerated from the media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryItem {
    /// Server-side item id.
    pub server_id: String,
    /// Catalog id, if the server knows one.
    pub external_id: Option<ExternalId>,
    pub title: String,
    /// Ids of the server groupings this item currently belongs to.
    pub grouping_ids: BTreeSet<String>,
}

impl LibraryItem {
    pub fn new(server_id: impl Into<String>, external_id: Option<ExternalId>, title: &str) -> Self {
        Self {
            server_id: server_id.into(),
            external_id,
            title: title.trim().to_string(),
            grouping_ids: BTreeSet::new(),
        }
    }
}

/// A single title in a canonical collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMember {
    pub id: ExternalId,
    #[serde(default)]
    pub title: String,
    /// Release date as reported by the catalog (`YYYY-MM-DD`, possibly empty).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl CollectionMember {
    /// Release year parsed from the first four characters of the release date.
    pub fn release_year(&self) -> Option<i32> {
        let date = self.release_date.as_deref()?;
        date.get(..4)?.parse().ok()
    }
}

/// Artwork reference as understood by the catalog (a TMDb poster path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PosterRef(pub String);

impl PosterRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The catalog's authoritative franchise grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalCollection {
    pub id: ExternalId,
    pub name: String,
    /// Members in catalog order.
    pub members: Vec<CollectionMember>,
    pub poster: Option<PosterRef>,
}

impl CanonicalCollection {
    pub fn member_ids(&self) -> impl Iterator<Item = ExternalId> + '_ {
        self.members.iter().map(|m| m.id)
    }

    pub fn contains(&self, id: ExternalId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }
}

/// A grouping (Jellyfin "BoxSet") that already exists on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    pub id: String,
    pub name: String,
    /// Server ids of the items in the grouping.
    pub member_ids: BTreeSet<String>,
    pub has_artwork: bool,
}

/// A canonical member that the library does not have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingItem {
    pub external_id: ExternalId,
    pub title: String,
    /// Name of the canonical collection that listed the title first.
    pub source_collection: String,
    pub release_year: Option<i32>,
}

/// State of an existing acquisition request on the request service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Processing,
    PartiallyAvailable,
    Available,
    Declined,
    Unknown,
}

impl RequestStatus {
    /// Whether the title is already pending or fulfilled downstream.
    pub fn is_outstanding(self) -> bool {
        matches!(
            self,
            Self::Pending
                | Self::Approved
                | Self::Processing
                | Self::PartiallyAvailable
                | Self::Available
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Processing => "processing",
            Self::PartiallyAvailable => "partially available",
            Self::Available => "available",
            Self::Declined => "declined",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Result of a create-request call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRequestOutcome {
    Created { request_id: String },
    /// The service already had a request for the title.
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_year() {
        let mut m = CollectionMember {
            id: ExternalId::new(1),
            title: "A".into(),
            release_date: Some("1999-03-31".into()),
        };
        assert_eq!(m.release_year(), Some(1999));
        m.release_date = Some(String::new());
        assert_eq!(m.release_year(), None);
        m.release_date = None;
        assert_eq!(m.release_year(), None);
    }

    #[test]
    fn test_outstanding_statuses() {
        assert!(RequestStatus::Pending.is_outstanding());
        assert!(RequestStatus::Available.is_outstanding());
        assert!(!RequestStatus::Declined.is_outstanding());
        assert!(!RequestStatus::Unknown.is_outstanding());
    }

    #[test]
    fn test_library_item_trims_title() {
        let item = LibraryItem::new("abc", None, "  The Matrix \n");
        assert_eq!(item.title, "The Matrix");
    }
}
