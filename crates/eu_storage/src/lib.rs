use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use eu_core::{ArticleCache, Error, Result};

pub mod backends;

pub use backends::*;

/// File the cache lives in when no path is configured
pub const DEFAULT_CACHE_PATH: &str = "cached_data.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Csv,
    Memory,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "file" => Ok(StorageKind::Csv),
            "memory" => Ok(StorageKind::Memory),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{}'. Available backends: csv, memory",
                other
            ))),
        }
    }
}

pub fn create_storage(kind: &str, path: Option<&Path>) -> Result<Arc<dyn ArticleCache>> {
    let storage: Arc<dyn ArticleCache> = match kind.parse::<StorageKind>()? {
        StorageKind::Csv => {
            let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH));
            Arc::new(CsvCache::new(path))
        }
        StorageKind::Memory => Arc::new(MemoryCache::new()),
    };
    tracing::debug!(backend = storage.name(), "created article cache");
    Ok(storage)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageKind, DEFAULT_CACHE_PATH};
    pub use eu_core::ArticleCache;
}
