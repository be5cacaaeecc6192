//! Durable [`StoragePort`][super::StoragePort] backend kept in a single JSON document.
//!
//! Reads go to an in-memory copy; every write replaces the document on disk.
use crate::error::Error;
use crate::storage::memory::InMemoryStorage;
use crate::storage::StoragePort;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Key/value pairs mirrored to a JSON object at `path`.
#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileStorage {
    storage: InMemoryStorage,
    path: PathBuf,
}

impl FileStorage {
    /// Open the document at `p`. A missing file is written out as `{}` first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the document is not a JSON object of strings, or
    /// [`Error::IO`] if it can't be read or created.
    pub async fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let path = p.as_ref().to_path_buf();
        let storage = match fs::read(&path).await {
            Ok(contents) => serde_json::from_slice(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("creating empty storage at {}", path.display());
                let empty = Self {
                    storage: InMemoryStorage::default(),
                    path,
                };
                empty.save().await?;
                return Ok(empty);
            }
            Err(err) => return Err(Error::IO(err)),
        };
        tracing::debug!("loaded storage state from {}", path.display());
        Ok(Self { storage, path })
    }

    /// Write every pair to disk, replacing the previous document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be written.
    pub async fn save(&self) -> Result<(), Error> {
        let document = serde_json::to_vec_pretty(&self.storage)?;
        fs::write(&self.path, document).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoragePort for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.storage.get(key).await
    }

    async fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        self.storage.set(key, value).await?;
        self.save().await
    }

    async fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.storage.remove(key).await?;
        self.save().await
    }
}
