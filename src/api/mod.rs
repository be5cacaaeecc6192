//! Client side of the remote ACME-DNS HTTP API.
//!
//! The remote service is authoritative for which registrations exist and for their non-secret
//! fields. [`DomainApi`] describes the calls the dashboard makes; [`HttpDomainApi`] performs them
//! over HTTP(S) with JSON bodies.
//!
//! # API Endpoints
//!
//! ## `/domains` (GET)
//!
//!   Authenticated with the static `X-Api-Key` header from
//!   [`Config::api_key`][crate::config::Config::api_key]. Returns a JSON array of:
//!
//!   ```json
//!   { "subdomain": "abc", "username": "u1", "fulldomain": "abc.acme.example.com",
//!     "allowfrom": [], "created_at": 1700000000, "updated_at": 1700000000 }
//!   ```
//!
//!   No `password` is ever included. A `null` body means no registrations.
//!
//! ## `/register` (POST)
//!
//!   Optional JSON body `{ "allowfrom": ["192.0.2.0/24"] }`. Returns HTTP 201 (Created) and:
//!
//!   ```json
//!   { "subdomain": "abc", "username": "u1", "password": "p1",
//!     "fulldomain": "abc.acme.example.com", "allowfrom": [] }
//!   ```
//!
//!   This is the only response that carries `password`.
//!
//! ## `/update` (POST)
//!
//!   Authenticated per registration with the `X-Api-User` and `X-Api-Key` headers. Expects:
//!
//!   ```json
//!   { "subdomain": "abc", "txt": "XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX" }
//!   ```
//!
//!   Where `txt` must be a valid [RFC-8555][RFC-8555] [DNS-01] challenge response. Rejected
//!   credentials return HTTP 401 or 403.
//!
//! ## `/health` (GET)
//!
//!   Returns HTTP 200 (OK), optionally with `{ "status": "online", "message": "..." }`.
//!
//! ## `/dns-check` (POST)
//!
//!   Server-side delegation check, body `{ "domain", "subdomain", "fulldomain" }`, answered with
//!   a [`VerificationResult`][crate::verify::VerificationResult].
//!
//! Errors are reported by the server as `{ "error": "reason" }` with a non-2xx status.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

pub mod client;
mod response;

pub use client::HttpDomainApi;

use crate::error::Error;
use crate::model::{HealthStatus, Registration, RegistrationRequest, RemoteDomain, UpdateRecordRequest};
use crate::verify::{DelegationQuery, VerificationResult};
use std::sync::Arc;

/// `DynDomainApi` is a type alias for a shared [`DomainApi`] implementation.
pub type DynDomainApi = Arc<dyn DomainApi + Send + Sync>;

/// The operations the dashboard performs against the remote ACME-DNS service.
#[async_trait::async_trait]
pub trait DomainApi {
    /// List every registration known to the server.
    async fn list_domains(&self) -> Result<Vec<RemoteDomain>, Error>;

    /// Register a new challenge subdomain.
    async fn register(&self, request: &RegistrationRequest) -> Result<Registration, Error>;

    /// Replace the challenge TXT value served for a registration.
    async fn update_txt(
        &self,
        username: &str,
        password: &str,
        update: &UpdateRecordRequest,
    ) -> Result<(), Error>;

    /// Report the server's health. Transport failures are returned as errors.
    async fn health(&self) -> Result<HealthStatus, Error>;

    /// Ask the server to check a CNAME delegation on the caller's behalf.
    async fn check_delegation(&self, query: &DelegationQuery) -> Result<VerificationResult, Error>;
}
