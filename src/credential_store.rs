//! Local credential storage.
//!
//! The remote ACME-DNS API never returns a password after registration, so this store is the only
//! durable holder of them. The full collection is serialized as one JSON array under
//! [`DOMAINS_KEY`] of a [`StoragePort`][crate::storage::StoragePort]; every mutation rewrites the
//! whole array.

use crate::error::Error;
use crate::model::DomainRecord;
use crate::storage::{DynStorage, DOMAINS_KEY};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// `DynRepository` is a type alias for a [`DomainRepository`] shared between consumers through an
/// [`Arc`] and a [`RwLock`].
pub type DynRepository = Arc<RwLock<dyn DomainRepository + Send + Sync>>;

/// Keyed collection of [`DomainRecord`]s, keyed by `fulldomain`.
#[async_trait::async_trait]
pub trait DomainRepository {
    /// Re-read the collection from durable storage, replacing the in-memory view.
    async fn load(&mut self) -> Result<Vec<DomainRecord>, Error>;

    /// Replace the whole collection and persist it.
    async fn save_all(&mut self, records: Vec<DomainRecord>) -> Result<(), Error>;

    /// All records, ordered by `fulldomain`.
    fn list(&self) -> Vec<DomainRecord>;

    fn get(&self, fulldomain: &str) -> Option<DomainRecord>;

    /// Insert or replace the record for its `fulldomain` and persist the collection.
    async fn put(&mut self, record: DomainRecord) -> Result<(), Error>;

    /// Remove the record for `fulldomain`, returning whether one existed.
    async fn delete(&mut self, fulldomain: &str) -> Result<bool, Error>;
}

#[allow(clippy::module_name_repetitions)]
pub struct CredentialStore {
    storage: DynStorage,
    records: BTreeMap<String, DomainRecord>,
}

impl CredentialStore {
    /// Open the store, loading whatever collection the storage port currently holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the stored collection can't be parsed.
    pub async fn open(storage: DynStorage) -> Result<Self, Error> {
        let mut store = Self {
            storage,
            records: BTreeMap::new(),
        };
        store.load().await?;
        Ok(store)
    }

    /// Wrap the store for sharing.
    pub fn shared(self) -> DynRepository {
        Arc::new(RwLock::new(self))
    }

    async fn persist(&self) -> Result<(), Error> {
        let records: Vec<&DomainRecord> = self.records.values().collect();
        let data = serde_json::to_string(&records)?;
        self.storage.write().await.set(DOMAINS_KEY, data).await?;
        tracing::debug!("persisted {} domain record(s)", records.len());
        Ok(())
    }
}

#[async_trait::async_trait]
impl DomainRepository for CredentialStore {
    async fn load(&mut self) -> Result<Vec<DomainRecord>, Error> {
        let stored = self.storage.read().await.get(DOMAINS_KEY).await?;
        let records: Vec<DomainRecord> = match stored {
            Some(data) => serde_json::from_str(&data)?,
            None => Vec::new(),
        };
        self.records = records
            .into_iter()
            .map(|r| (r.fulldomain.clone(), r))
            .collect();
        Ok(self.list())
    }

    async fn save_all(&mut self, records: Vec<DomainRecord>) -> Result<(), Error> {
        self.records = records
            .into_iter()
            .map(|r| (r.fulldomain.clone(), r))
            .collect();
        self.persist().await
    }

    fn list(&self) -> Vec<DomainRecord> {
        self.records.values().cloned().collect()
    }

    fn get(&self, fulldomain: &str) -> Option<DomainRecord> {
        self.records.get(fulldomain).cloned()
    }

    async fn put(&mut self, mut record: DomainRecord) -> Result<(), Error> {
        if let Some(existing) = self.records.get(&record.fulldomain) {
            // A populated password is never replaced by an empty one.
            if !record.has_password() && existing.has_password() {
                record.password = existing.password.clone();
            }
        }
        self.records.insert(record.fulldomain.clone(), record);
        self.persist().await
    }

    async fn delete(&mut self, fulldomain: &str) -> Result<bool, Error> {
        if self.records.remove(fulldomain).is_none() {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }
}
