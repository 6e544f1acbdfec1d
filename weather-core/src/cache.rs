//! File-backed forecast cache: one JSON file per normalized location.

use std::{
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{error::CacheError, model::ForecastResult};

/// Normalized cache key: lower-cased, spaces replaced by underscores.
///
/// Path separators are replaced as well so a location can never escape the
/// cache directory.
pub fn cache_key(location: &str) -> String {
    location
        .to_lowercase()
        .replace(' ', "_")
        .replace(['/', '\\'], "_")
}

pub trait ForecastStore: Send + Sync + Debug {
    /// Stored result for `key`. Unreadable or corrupted entries count as absent.
    fn read(&self, key: &str) -> Option<ForecastResult>;

    /// Store `result` under `key`, replacing any previous entry.
    fn write(&self, key: &str, result: &ForecastResult) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first write, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Like [`ForecastStore::read`], but reports why an entry was unusable.
    pub fn load(&self, key: &str) -> Result<Option<ForecastResult>, CacheError> {
        let path = self.entry_path(key);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let result = serde_json::from_str(&contents)
            .map_err(|source| CacheError::Corrupt { path, source })?;

        Ok(Some(result))
    }
}

impl ForecastStore for FileStore {
    fn read(&self, key: &str) -> Option<ForecastResult> {
        match self.load(key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "Ignoring unusable forecast cache entry");
                None
            }
        }
    }

    fn write(&self, key: &str, result: &ForecastResult) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.entry_path(key);
        let json = serde_json::to_string_pretty(result).map_err(CacheError::Encode)?;

        fs::write(&path, json).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Wrote forecast cache entry");
        Ok(())
    }
}
