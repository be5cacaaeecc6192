//! The dashboard session gate.
//!
//! A single username/password pair from the [configuration][crate::config::DashboardCredentials]
//! unlocks the dashboard. A successful [`SessionGate::login`] stores an opaque token under
//! [`SESSION_TOKEN_KEY`]; its presence is all that "authenticated" means. Tokens never expire and
//! are not validated anywhere. This gates casual access to the dashboard only: the remote API is
//! protected by its own key.

use crate::config::DashboardCredentials;
use crate::error::Error;
use crate::storage::{DynStorage, SESSION_TOKEN_KEY};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use time::OffsetDateTime;

pub struct SessionGate {
    credentials: DashboardCredentials,
    storage: DynStorage,
    authenticated: bool,
}

impl SessionGate {
    /// Build a gate, authenticated if a token is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage port can't be read.
    pub async fn restore(
        credentials: DashboardCredentials,
        storage: DynStorage,
    ) -> Result<Self, Error> {
        let authenticated = storage.read().await.get(SESSION_TOKEN_KEY).await?.is_some();
        Ok(Self {
            credentials,
            storage,
            authenticated,
        })
    }

    /// Compare the pair with the configured one. A match stores a fresh token; a mismatch leaves
    /// storage untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the token can't be stored.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<bool, Error> {
        if username != self.credentials.username || password != self.credentials.password {
            tracing::info!("rejected dashboard login for \"{username}\"");
            return Ok(false);
        }
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let token = STANDARD.encode(format!("{username}:{millis}"));
        self.storage
            .write()
            .await
            .set(SESSION_TOKEN_KEY, token)
            .await?;
        self.authenticated = true;
        tracing::info!("dashboard session started for \"{username}\"");
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns the storage error if the token can't be removed.
    pub async fn logout(&mut self) -> Result<(), Error> {
        self.storage.write().await.remove(SESSION_TOKEN_KEY).await?;
        self.authenticated = false;
        tracing::debug!("dashboard session ended");
        Ok(())
    }

    /// Whether a session token is currently stored.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the token can't be read.
    pub async fn is_authenticated(&self) -> Result<bool, Error> {
        Ok(self
            .storage
            .read()
            .await
            .get(SESSION_TOKEN_KEY)
            .await?
            .is_some())
    }

    /// The flag as of the last login, logout or restore.
    pub fn authenticated(&self) -> bool {
        self.authenticated
    }
}
