use std::path::PathBuf;
use thiserror::Error;

/// Failures of the on-disk forecast cache.
///
/// None of these reach callers of `ForecastService::get_forecast`: a read
/// failure is a cache miss and a write failure only loses the cache entry.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted cache entry {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode forecast for cache: {0}")]
    Encode(#[source] serde_json::Error),
}
