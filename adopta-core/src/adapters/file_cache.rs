//! File cache - one file per key under a cache directory

use std::path::PathBuf;

use async_trait::async_trait;

use crate::adapters::{blocking, json_file};
use crate::domain::result::{Error, Result};
use crate::ports::LocalCache;

/// Persistent cache; a record survives process restarts
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Keys become file names, so they are restricted to a safe alphabet
    fn record_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::cache(format!("invalid cache key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.record_path(key)?;
        blocking(move || json_file::read_string(&path)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.record_path(key)?;
        let value = value.to_string();
        blocking(move || json_file::write_string(&path, &value)).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.record_path(key)?;
        blocking(move || json_file::remove(&path)).await
    }
}
