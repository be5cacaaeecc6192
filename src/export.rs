//! Credential export formats.

use crate::error::Error;
use crate::model::DomainRecord;
use crate::verify::normalize_user_domain;
use serde::Serialize;
use std::collections::BTreeMap;

/// The fields a client needs to update the record.
#[derive(Serialize)]
struct Credentials<'a> {
    fulldomain: &'a str,
    subdomain: &'a str,
    username: &'a str,
    password: &'a str,
    allowfrom: &'a [String],
}

impl<'a> From<&'a DomainRecord> for Credentials<'a> {
    fn from(record: &'a DomainRecord) -> Self {
        Self {
            fulldomain: &record.fulldomain,
            subdomain: &record.subdomain,
            username: &record.username,
            password: &record.password,
            allowfrom: &record.allowfrom,
        }
    }
}

/// The record's credentials as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`Error::InvalidJSON`] if serialization fails.
pub fn credentials_json(record: &DomainRecord) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(&Credentials::from(record))?)
}

/// The account file read by certbot's `acme-dns-auth` hook: credentials keyed by the domain a
/// certificate is requested for.
///
/// # Errors
///
/// Returns [`Error::InvalidJSON`] if serialization fails.
pub fn acme_dns_auth_json(user_domain: &str, record: &DomainRecord) -> Result<String, Error> {
    let mut accounts = BTreeMap::new();
    accounts.insert(normalize_user_domain(user_domain), Credentials::from(record));
    Ok(serde_json::to_string_pretty(&accounts)?)
}

/// A manual certbot invocation for `user_domain` and its wildcard, followed by the credentials as
/// shell comments.
pub fn certbot_hint(user_domain: &str, record: &DomainRecord) -> String {
    let domain = normalize_user_domain(user_domain);
    let domain = if domain.is_empty() {
        "yourdomain.com".to_string()
    } else {
        domain
    };
    format!(
        "certbot certonly --manual \\\n  \
         --preferred-challenges dns \\\n  \
         --manual-auth-hook \"acme-dns-auth.py\" \\\n  \
         --manual-cleanup-hook \"acme-dns-cleanup.py\" \\\n  \
         -d {domain} \\\n  \
         -d *.{domain}\n\
         \n\
         # ACME-DNS Credentials:\n\
         # Username: {}\n\
         # Password: {}\n\
         # Fulldomain: {}",
        record.username, record.password, record.fulldomain
    )
}
