//! ACME Dash
//!
//! Credential dashboard for [acme-dns] servers.
//!
//! Registers challenge subdomains with a remote ACME-DNS API, keeps the credentials it issues
//! (the server only ever reveals a password once) and checks that a domain's `_acme-challenge`
//! name delegates to its registration with a CNAME, so [RFC-8555][RFC-8555] [DNS-01] challenges
//! can be answered without write access to the domain's own DNS zone.
//!
//! [acme-dns]: https://github.com/joohoi/acme-dns
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod credential_store;
pub mod edit;
pub mod error;
pub mod export;
pub mod model;
pub mod reconciler;
pub mod session;
pub mod storage;
pub mod verify;

#[cfg(test)]
mod test_utils;

pub use api::{DomainApi, DynDomainApi, HttpDomainApi};
pub use config::{Config, Shared};
pub use credential_store::{CredentialStore, DomainRepository, DynRepository};
pub use model::DomainRecord;
pub use reconciler::{DomainCache, DomainListing, ListingOrigin};
pub use session::SessionGate;
pub use storage::{FileStorage, InMemoryStorage};
