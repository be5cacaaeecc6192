//! Domain cache reconciliation.
//!
//! [`DomainCache`] is the single entry point for listing and changing registrations. It combines
//! two views of the same data:
//!
//! * the remote API, authoritative for which registrations exist and for every non-secret field,
//!   but which never returns a password after registration;
//! * the local [credential store][crate::credential_store], the only durable holder of
//!   passwords and of the purely local `display_name` and `last_active_at` fields.
//!
//! Merges are asymmetric: a successful listing replaces the whole local collection with the
//! server's records, then restores each surviving record's locally-held password and local-only
//! fields. If listing fails, the cached collection is returned unchanged.
//!
//! Renames and deletions are local only. Deleting a record does not deregister it: the server
//! keeps serving it to anyone who still holds the credentials.

use crate::api::DynDomainApi;
use crate::credential_store::DynRepository;
use crate::error::Error;
use crate::model::{DomainRecord, HealthStatus, RegistrationRequest, UpdateRecordRequest};
use ipnetwork::IpNetwork;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use time::OffsetDateTime;

/// Where the records of a [`DomainListing`] came from.
#[derive(Debug)]
pub enum ListingOrigin {
    /// Fresh from the remote API, merged with local secrets.
    Remote,
    /// The remote API could not be listed; these are the cached records, unchanged.
    Cache { reason: Error },
}

#[derive(Debug)]
pub struct DomainListing {
    pub domains: Vec<DomainRecord>,
    pub origin: ListingOrigin,
}

impl DomainListing {
    pub fn is_fresh(&self) -> bool {
        matches!(self.origin, ListingOrigin::Remote)
    }
}

#[derive(Clone)]
pub struct DomainCache {
    api: DynDomainApi,
    repository: DynRepository,
}

impl DomainCache {
    pub fn new(api: DynDomainApi, repository: DynRepository) -> Self {
        Self { api, repository }
    }

    /// List registrations, preferring the server's view and falling back to the cache.
    ///
    /// # Errors
    ///
    /// Only fails if a successful server listing can't be persisted locally. A failed server
    /// listing is reported through [`ListingOrigin::Cache`].
    pub async fn list_domains(&self) -> Result<DomainListing, Error> {
        let remote = match self.api.list_domains().await {
            Ok(remote) => remote,
            Err(reason) => {
                tracing::warn!("listing domains from server failed, using cached records: {reason}");
                let domains = self.repository.read().await.list();
                return Ok(DomainListing {
                    domains,
                    origin: ListingOrigin::Cache { reason },
                });
            }
        };

        let mut repository = self.repository.write().await;
        let cached: HashMap<String, DomainRecord> = repository
            .list()
            .into_iter()
            .map(|r| (r.fulldomain.clone(), r))
            .collect();

        // The server may list a fulldomain more than once; every copy gets the local fields.
        let merged: Vec<DomainRecord> = remote
            .into_iter()
            .map(|remote| {
                let mut record = DomainRecord::from_remote(remote);
                if let Some(local) = cached.get(&record.fulldomain) {
                    if local.has_password() {
                        record.password = local.password.clone();
                    }
                    record.display_name = local.display_name.clone();
                    record.last_active_at = local.last_active_at;
                }
                record
            })
            .collect();

        let listed: HashSet<&str> = merged.iter().map(|r| r.fulldomain.as_str()).collect();
        let dropped = cached.keys().filter(|k| !listed.contains(k.as_str())).count();
        if dropped > 0 {
            tracing::info!("dropping {dropped} cached record(s) no longer listed by the server");
        }
        repository.save_all(merged).await?;
        let domains = repository.list();
        tracing::debug!("listed {} domain(s) from server", domains.len());
        Ok(DomainListing {
            domains,
            origin: ListingOrigin::Remote,
        })
    }

    /// Register a new challenge subdomain and keep its credentials locally.
    ///
    /// `display_name` is stored locally only; it is never sent to the server. A blank name is
    /// stored as absent. Every `allow_from` entry must be a CIDR network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registration`] if an `allow_from` entry is invalid, the server call fails,
    /// or the server's response lacks a usable domain or credentials.
    pub async fn register_domain(
        &self,
        display_name: &str,
        allow_from: &[String],
    ) -> Result<DomainRecord, Error> {
        for cidr in allow_from {
            IpNetwork::from_str(cidr).map_err(|err| {
                Error::Registration(format!("invalid allowfrom network \"{cidr}\": {err}"))
            })?;
        }
        let request = RegistrationRequest {
            allowfrom: (!allow_from.is_empty()).then(|| allow_from.to_vec()),
        };

        let registration = self
            .api
            .register(&request)
            .await
            .map_err(|err| Error::Registration(err.to_string()))?;
        if registration.fulldomain.is_empty() || registration.subdomain.is_empty() {
            return Err(Error::Registration(
                "server returned no usable domain name".to_string(),
            ));
        }
        if registration.username.is_empty() || registration.password.is_empty() {
            return Err(Error::Registration(
                "server returned incomplete credentials".to_string(),
            ));
        }

        let record = DomainRecord::from_registration(
            registration,
            normalize_display_name(display_name),
            OffsetDateTime::now_utc(),
        );
        self.repository.write().await.put(record.clone()).await?;
        tracing::info!("registered \"{}\"", record.fulldomain);
        Ok(record)
    }

    pub async fn get_domain(&self, fulldomain: &str) -> Option<DomainRecord> {
        self.repository.read().await.get(fulldomain)
    }

    /// Change the local display name of a record. A blank name clears it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record is stored for `fulldomain`.
    pub async fn rename_domain(
        &self,
        fulldomain: &str,
        new_name: &str,
    ) -> Result<DomainRecord, Error> {
        let mut repository = self.repository.write().await;
        let mut record = repository
            .get(fulldomain)
            .ok_or_else(|| Error::NotFound(fulldomain.to_string()))?;
        record.display_name = normalize_display_name(new_name);
        repository.put(record.clone()).await?;
        tracing::debug!("renamed \"{fulldomain}\"");
        Ok(record)
    }

    /// Forget a record locally, returning whether one was stored. The server is not contacted.
    pub async fn delete_domain(&self, fulldomain: &str) -> Result<bool, Error> {
        let deleted = self.repository.write().await.delete(fulldomain).await?;
        if deleted {
            tracing::info!("removed \"{fulldomain}\" from local storage");
        }
        Ok(deleted)
    }

    /// Publish a new challenge TXT value for `record` using its stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChallenge`] for a malformed `txt`, [`Error::Auth`] if the record
    /// has no password or the server rejects the credentials, and [`Error::Network`] or
    /// [`Error::Rejected`] for other failures. Nothing is retried.
    pub async fn submit_challenge_value(
        &self,
        record: &DomainRecord,
        txt: &str,
    ) -> Result<DomainRecord, Error> {
        let update = UpdateRecordRequest {
            subdomain: record.subdomain.clone(),
            txt: txt.trim().to_string(),
        };
        update.valid_dns01()?;
        if !record.has_password() {
            return Err(Error::Auth(format!(
                "no password stored for \"{}\"",
                record.fulldomain
            )));
        }

        self.api
            .update_txt(&record.username, &record.password, &update)
            .await?;

        let now = OffsetDateTime::now_utc();
        let mut repository = self.repository.write().await;
        let mut updated = repository
            .get(&record.fulldomain)
            .unwrap_or_else(|| record.clone());
        updated.updated_at = Some(now);
        updated.last_active_at = Some(now);
        repository.put(updated.clone()).await?;
        tracing::info!("updated challenge TXT for \"{}\"", record.fulldomain);
        Ok(updated)
    }

    /// Server health. Never fails: an unreachable server reports
    /// [`HealthStatus::unreachable`].
    pub async fn health(&self) -> HealthStatus {
        match self.api.health().await {
            Ok(health) => health,
            Err(err) => {
                tracing::debug!("health check failed: {err}");
                HealthStatus::unreachable()
            }
        }
    }
}

fn normalize_display_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
