//! Durable key/value storage.
//!
//! The dashboard keeps two pieces of state between sessions: the
//! [credential collection][crate::credential_store] under [`DOMAINS_KEY`] and the
//! [session token][crate::session] under [`SESSION_TOKEN_KEY`]. Both are opaque strings stored
//! behind the [`StoragePort`] trait, the same shape as a browser's origin-scoped local storage.
//!
//! Two implementations are provided, [`memory::InMemoryStorage`] and [`file::FileStorage`]. The
//! former is not durable across restarts. The latter writes its state to disk for each update
//! and loads this state again on startup.
//!
//! Values are stored in clear text. Anyone who can read the backing file can read every stored
//! ACME-DNS password.

use crate::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileStorage;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryStorage;

/// Key holding the JSON array of [`DomainRecord`][crate::model::DomainRecord]s.
pub const DOMAINS_KEY: &str = "acme_domains";

/// Key holding the opaque dashboard session token.
pub const SESSION_TOKEN_KEY: &str = "authToken";

/// `DynStorage` is a type alias for a [`StoragePort`] that can be used by multiple read/write
/// consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the [`StoragePort`].
pub type DynStorage = Arc<RwLock<dyn StoragePort + Send + Sync>>;

/// An async trait describing string values stored by key. Every write replaces the whole value.
#[async_trait::async_trait]
pub trait StoragePort {
    /// Get the value stored for `key` (if any).
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` for `key`, replacing any previous value.
    async fn set(&mut self, key: &str, value: String) -> Result<(), Error>;

    /// Remove the value stored for `key`. Removing an absent key is not an error.
    async fn remove(&mut self, key: &str) -> Result<(), Error>;
}

/// Wrap a [`StoragePort`] implementation for sharing.
pub fn shared<S>(storage: S) -> DynStorage
where
    S: StoragePort + Send + Sync + 'static,
{
    Arc::new(RwLock::new(storage))
}
