//! Offline collection membership from a local snapshot dataset.
//!
//! The dataset is a directory holding `collections.json` and, optionally,
//! `movies.jsonl` with per-movie details. Both are read once at load time;
//! resolution afterwards is a map lookup. No network, no cache writes, no
//! artwork.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use boxsmith_core::{CanonicalCollection, CollectionMember, CollectionProvider, ExternalId, Lookup};
use serde::Deserialize;

use crate::error::TmdbError;

pub const COLLECTIONS_FILE: &str = "collections.json";
pub const MOVIES_FILE: &str = "movies.jsonl";

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    collections: BTreeMap<String, SnapshotCollection>,
}

#[derive(Debug, Deserialize)]
struct SnapshotCollection {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    movies: Vec<SnapshotMovie>,
}

#[derive(Debug, Deserialize)]
struct SnapshotMovie {
    id: ExternalId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
}

/// Catalog membership served from a snapshot dataset.
#[derive(Debug, Default)]
pub struct SnapshotProvider {
    by_movie: HashMap<ExternalId, Arc<CanonicalCollection>>,
    collections: usize,
}

impl SnapshotProvider {
    /// Load the dataset in `dir`. A missing or malformed `collections.json`
    /// is fatal; `movies.jsonl` is optional.
    pub fn load(dir: &Path) -> Result<Self, TmdbError> {
        let index_path = dir.join(COLLECTIONS_FILE);
        let contents = fs::read_to_string(&index_path).map_err(|e| {
            TmdbError::snapshot(format!("cannot read {}: {}", index_path.display(), e))
        })?;

        let details_path = dir.join(MOVIES_FILE);
        let provider = if details_path.exists() {
            let file = fs::File::open(&details_path)?;
            Self::from_reader(&contents, Some(BufReader::new(file)))?
        } else {
            Self::from_reader(&contents, None::<BufReader<fs::File>>)?
        };

        log::info!(
            "Loaded snapshot {}: {} collections, {} movies",
            dir.display(),
            provider.collections,
            provider.by_movie.len()
        );
        Ok(provider)
    }

    /// Build from the index JSON and an optional JSON Lines detail stream.
    pub fn from_reader<R: BufRead>(index: &str, details: Option<R>) -> Result<Self, TmdbError> {
        let file: SnapshotFile = serde_json::from_str(index)
            .map_err(|e| TmdbError::snapshot(format!("{COLLECTIONS_FILE}: {e}")))?;

        let mut collections = Vec::with_capacity(file.collections.len());
        for (key, entry) in file.collections {
            let id: ExternalId = key.parse().map_err(|_| {
                TmdbError::snapshot(format!("{COLLECTIONS_FILE}: invalid collection id '{key}'"))
            })?;
            collections.push((id, entry));
        }
        // Map keys sort as strings; first-wins conflicts go by numeric id.
        collections.sort_by_key(|(id, _)| *id);

        let mut canonical: Vec<CanonicalCollection> = collections
            .into_iter()
            .map(|(id, entry)| {
                let mut members: Vec<CollectionMember> = Vec::with_capacity(entry.movies.len());
                for movie in entry.movies {
                    if members.iter().any(|m| m.id == movie.id) {
                        continue;
                    }
                    members.push(CollectionMember {
                        id: movie.id,
                        title: movie.title.unwrap_or_default(),
                        release_date: movie.release_date.filter(|d| !d.is_empty()),
                    });
                }
                CanonicalCollection {
                    id,
                    name: entry
                        .name
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| format!("Collection {id}")),
                    members,
                    poster: None,
                }
            })
            .collect();

        if let Some(details) = details {
            fill_details(&mut canonical, details)?;
        }

        let count = canonical.len();
        let mut by_movie: HashMap<ExternalId, Arc<CanonicalCollection>> = HashMap::new();
        for collection in canonical {
            let collection = Arc::new(collection);
            for member in collection.member_ids() {
                match by_movie.get(&member) {
                    Some(existing) => log::warn!(
                        "Snapshot lists movie {} in both '{}' ({}) and '{}' ({}); keeping '{}'",
                        member,
                        existing.name,
                        existing.id,
                        collection.name,
                        collection.id,
                        existing.name,
                    ),
                    None => {
                        by_movie.insert(member, Arc::clone(&collection));
                    }
                }
            }
        }

        Ok(Self {
            by_movie,
            collections: count,
        })
    }

    pub fn collection_count(&self) -> usize {
        self.collections
    }

    pub fn movie_count(&self) -> usize {
        self.by_movie.len()
    }
}

/// Stream `movies.jsonl`, filling member titles and release dates the index
/// left out.
fn fill_details<R: BufRead>(
    collections: &mut [CanonicalCollection],
    details: R,
) -> Result<(), TmdbError> {
    let wanted: HashSet<ExternalId> = collections
        .iter()
        .flat_map(|c| c.members.iter())
        .filter(|m| m.title.is_empty() || m.release_date.is_none())
        .map(|m| m.id)
        .collect();
    if wanted.is_empty() {
        return Ok(());
    }

    let mut found: HashMap<ExternalId, SnapshotMovie> = HashMap::new();
    for (idx, line) in details.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let movie: SnapshotMovie = serde_json::from_str(line)
            .map_err(|e| TmdbError::snapshot(format!("{MOVIES_FILE} line {}: {e}", idx + 1)))?;
        if wanted.contains(&movie.id) {
            found.entry(movie.id).or_insert(movie);
        }
    }

    for member in collections.iter_mut().flat_map(|c| c.members.iter_mut()) {
        let Some(detail) = found.get(&member.id) else {
            continue;
        };
        if member.title.is_empty() {
            if let Some(title) = &detail.title {
                member.title = title.clone();
            }
        }
        if member.release_date.is_none() {
            member.release_date = detail.release_date.clone().filter(|d| !d.is_empty());
        }
    }
    Ok(())
}

impl CollectionProvider for SnapshotProvider {
    async fn resolve(&self, id: ExternalId) -> Lookup {
        match self.by_movie.get(&id) {
            Some(collection) => Lookup::Found(CanonicalCollection::clone(collection)),
            None => Lookup::NoCollection,
        }
    }
}

#[cfg(test)]
#[path = "tests/snapshot_tests.rs"]
mod tests;
