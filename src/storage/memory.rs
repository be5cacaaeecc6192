use crate::error::Error;
use crate::storage::StoragePort;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryStorage {
    values: BTreeMap<String, String>,
}

#[async_trait::async_trait]
impl StoragePort for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.values.remove(key);
        Ok(())
    }
}
