//! JSON file backend for the persistent catalog cache.
//!
//! Layout on disk:
//!
//! ```json
//! { "version": 1,
//!   "movie":   { "603":  { "payload": {...}, "fetched_at": "..." } },
//!   "artwork": { "2344": { "payload": {"poster": "/x.jpg"}, "fetched_at": "..." } } }
//! ```
//!
//! Puts are buffered in memory. The whole file is rewritten through a temp
//! file and a rename once [`FLUSH_EVERY`] puts are pending, on
//! [`CacheStore::flush`], and when the cache is dropped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use boxsmith_core::{CacheEntry, CacheError, CacheKey, CacheStore, ExternalId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{CollectionRecord, MovieRecord, ResolvedPayload};

/// Bump when the payload layout changes; older files are discarded.
const CACHE_VERSION: u32 = 1;

const CACHE_FILE_NAME: &str = "tmdb_cache.json";

/// Pending puts that trigger a rewrite of the file.
pub const FLUSH_EVERY: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    movie: BTreeMap<String, CacheEntry>,
    #[serde(default)]
    artwork: BTreeMap<String, CacheEntry>,
}

impl CacheFile {
    fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            ..Default::default()
        }
    }

    fn section(&self, key: &CacheKey) -> &BTreeMap<String, CacheEntry> {
        match key {
            CacheKey::Movie(_) => &self.movie,
            CacheKey::Artwork(_) => &self.artwork,
        }
    }

    fn section_mut(&mut self, key: &CacheKey) -> &mut BTreeMap<String, CacheEntry> {
        match key {
            CacheKey::Movie(_) => &mut self.movie,
            CacheKey::Artwork(_) => &mut self.artwork,
        }
    }
}

/// Entry counts for `cache info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub path: PathBuf,
    pub movies: usize,
    pub artwork: usize,
    /// Size of the file on disk, if it exists.
    pub file_size: Option<u64>,
}

/// Default cache location: `~/.cache/boxsmith/tmdb_cache.json`.
pub fn default_cache_path() -> Result<PathBuf, CacheError> {
    let base =
        dirs::cache_dir().ok_or_else(|| CacheError::other("Could not determine cache directory"))?;
    Ok(base.join("boxsmith").join(CACHE_FILE_NAME))
}

#[derive(Debug)]
struct CacheState {
    file: CacheFile,
    /// Puts not yet written to disk.
    unsaved: usize,
}

/// Persistent cache stored as a single JSON document.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    data: Mutex<CacheState>,
}

impl JsonFileCache {
    /// Open the cache at `path`. A missing file is an empty cache; a corrupt
    /// or outdated one is ignored with a warning and overwritten by the next
    /// write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => parse_cache(&path, &contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheFile::empty(),
            Err(e) => {
                log::warn!("Cannot read cache {}: {}; starting empty", path.display(), e);
                CacheFile::empty()
            }
        };
        log::debug!(
            "Opened cache {} ({} movies, {} artwork)",
            path.display(),
            data.movie.len(),
            data.artwork.len()
        );
        Self {
            path,
            data: Mutex::new(CacheState {
                file: data,
                unsaved: 0,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> CacheStats {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            path: self.path.clone(),
            movies: data.file.movie.len(),
            artwork: data.file.artwork.len(),
            file_size: fs::metadata(&self.path).ok().map(|m| m.len()),
        }
    }

    fn persist(&self, data: &CacheFile) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CacheStore for JsonFileCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let hit = data.file.section(key).get(&key.id().to_string()).cloned();
        log::debug!("Cache {} {}", if hit.is_some() { "hit" } else { "miss" }, key);
        hit
    }

    fn put(&self, key: &CacheKey, payload: Value) -> Result<(), CacheError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.file
            .section_mut(key)
            .insert(key.id().to_string(), CacheEntry::new(payload));
        data.unsaved += 1;
        if data.unsaved >= FLUSH_EVERY {
            self.persist(&data.file)?;
            data.unsaved = 0;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), CacheError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        if data.unsaved == 0 {
            return Ok(());
        }
        self.persist(&data.file)?;
        log::debug!("Flushed {} cache entries to {}", data.unsaved, self.path.display());
        data.unsaved = 0;
        Ok(())
    }
}

impl Drop for JsonFileCache {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("Failed to save cache {}: {}", self.path.display(), e);
        }
    }
}

/// Delete the cache file. Returns the number of bytes freed.
pub fn clear_cache(path: &Path) -> Result<u64, CacheError> {
    match fs::metadata(path) {
        Ok(meta) => {
            fs::remove_file(path)?;
            Ok(meta.len())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn parse_cache(path: &Path, contents: &str) -> CacheFile {
    let raw: Value = match serde_json::from_str(contents) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Cache {} is corrupt ({}); ignoring it", path.display(), e);
            return CacheFile::empty();
        }
    };

    let Some(obj) = raw.as_object() else {
        log::warn!("Cache {} is not a JSON object; ignoring it", path.display());
        return CacheFile::empty();
    };

    if let Some(version) = obj.get("version") {
        if version.as_u64() != Some(u64::from(CACHE_VERSION)) {
            log::warn!(
                "Cache {} has version {}, expected {}; ignoring it",
                path.display(),
                version,
                CACHE_VERSION
            );
            return CacheFile::empty();
        }
        return match serde_json::from_value::<CacheFile>(raw) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("Cache {} is corrupt ({}); ignoring it", path.display(), e);
                CacheFile::empty()
            }
        };
    }

    let file = migrate_legacy(obj);
    log::info!(
        "Migrated legacy cache {} ({} movies)",
        path.display(),
        file.movie.len()
    );
    file
}

/// Fold the older unversioned layouts into the current one.
///
/// Two shapes are understood: sectioned (`{"movie": {...}, "collection":
/// {...}}`) and flat (`{"/movie/603": {...}, "/collection/2344": {...}}`).
/// Each movie is joined with its collection so it becomes one resolved
/// payload; entries that do not parse are dropped.
fn migrate_legacy(obj: &serde_json::Map<String, Value>) -> CacheFile {
    let mut movies: BTreeMap<String, &Value> = BTreeMap::new();
    let mut collections: BTreeMap<String, &Value> = BTreeMap::new();

    if obj.contains_key("movie") || obj.contains_key("collection") {
        if let Some(section) = obj.get("movie").and_then(Value::as_object) {
            movies.extend(section.iter().map(|(k, v)| (k.clone(), v)));
        }
        if let Some(section) = obj.get("collection").and_then(Value::as_object) {
            collections.extend(section.iter().map(|(k, v)| (k.clone(), v)));
        }
    } else {
        for (key, value) in obj {
            if let Some(id) = key.strip_prefix("/movie/") {
                movies.insert(id.to_string(), value);
            } else if let Some(id) = key.strip_prefix("/collection/") {
                collections.insert(id.to_string(), value);
            }
        }
    }

    let fetched_at = Utc::now();
    let mut file = CacheFile::empty();
    for (key, value) in movies {
        let Ok(id) = key.parse::<ExternalId>() else {
            continue;
        };
        let Ok(movie) = serde_json::from_value::<MovieRecord>(value.clone()) else {
            continue;
        };
        let collection = movie
            .collection
            .as_ref()
            .and_then(|stub| collections.get(&stub.id.to_string()))
            .and_then(|v| serde_json::from_value::<CollectionRecord>((*v).clone()).ok());
        let payload = ResolvedPayload { movie, collection };
        let Ok(payload) = serde_json::to_value(&payload) else {
            continue;
        };
        file.movie.insert(
            id.to_string(),
            CacheEntry {
                payload,
                fetched_at,
            },
        );
    }
    file
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
