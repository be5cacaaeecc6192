//! DNS delegation checks.
//!
//! To let an ACME-DNS registration answer [DNS-01] challenges for `example.com`, the owner of
//! `example.com` creates a CNAME from `_acme-challenge.example.com` to the registration's
//! `fulldomain`. A [`DelegationChecker`] reports whether that CNAME is in place.
//!
//! A missing or wrong CNAME is an expected outcome while DNS changes propagate, so it is reported
//! as a [`VerificationResult`] with `valid == false` and a message, never as an error. Lookup
//! failures are reported the same way, in [`VerificationResult::error_message`].
//!
//! Two checkers are provided: [`resolver::ResolverChecker`] resolves the CNAME from this host and
//! [`remote::RemoteChecker`] asks the remote API to do it.
//!
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

pub mod remote;
pub mod resolver;

pub use remote::RemoteChecker;
pub use resolver::ResolverChecker;

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `DynDelegationChecker` is a type alias for a shared [`DelegationChecker`] implementation.
pub type DynDelegationChecker = Arc<dyn DelegationChecker + Send + Sync>;

pub const CHALLENGE_LABEL: &str = "_acme-challenge";

pub const ERROR_NXDOMAIN: &str = "NXDOMAIN";
pub const ERROR_DNS: &str = "DNS_ERROR";
pub const ERROR_NETWORK: &str = "NETWORK_ERROR";

#[async_trait::async_trait]
pub trait DelegationChecker {
    /// Check whether `_acme-challenge.<user_domain>` is a CNAME for `fulldomain`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] only when the check can't be attempted, e.g. for an empty
    /// `user_domain` or `fulldomain`.
    async fn check_delegation(
        &self,
        user_domain: &str,
        subdomain: &str,
        fulldomain: &str,
    ) -> Result<VerificationResult, Error>;
}

/// The inputs of a delegation check, also the body of the remote `/dns-check` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DelegationQuery {
    #[serde(rename = "domain")]
    pub user_domain: String,
    pub subdomain: String,
    pub fulldomain: String,
}

impl DelegationQuery {
    /// Normalise and validate the inputs of a check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] if `user_domain` is empty after normalisation or
    /// `fulldomain` is empty.
    pub fn new(user_domain: &str, subdomain: &str, fulldomain: &str) -> Result<Self, Error> {
        let user_domain = normalize_user_domain(user_domain);
        if user_domain.is_empty() {
            return Err(Error::Verification("a domain name is required".to_string()));
        }
        let fulldomain = strip_root(fulldomain.trim()).to_string();
        if fulldomain.is_empty() {
            return Err(Error::Verification(
                "no ACME-DNS domain available".to_string(),
            ));
        }
        Ok(Self {
            user_domain,
            subdomain: subdomain.trim().to_string(),
            fulldomain,
        })
    }

    /// The name that must carry the CNAME: `_acme-challenge.<user_domain>`.
    pub fn challenge_name(&self) -> String {
        format!("{CHALLENGE_LABEL}.{}", self.user_domain)
    }
}

/// Outcome of a delegation check.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    #[serde(default)]
    pub has_cname: bool,
    #[serde(default)]
    pub cname_target: String,
    #[serde(rename = "expected", default)]
    pub expected_target: String,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<String>,
}

impl VerificationResult {
    /// A result for a check that could not reach an answer.
    pub fn failed(query: &DelegationQuery, error: &str, message: String) -> Self {
        Self {
            expected_target: query.fulldomain.clone(),
            error_message: Some(error.to_string()),
            message,
            ..Self::default()
        }
    }
}

/// What a CNAME lookup for the challenge name found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CnameLookup {
    /// A CNAME exists, pointing at `target`. `records` are the addresses the name resolves to.
    Found { target: String, records: Vec<String> },
    /// The name exists but has no CNAME.
    NoCname,
    /// The name does not exist.
    NxDomain,
    /// The lookup itself failed.
    Failed(String),
}

/// Turn a lookup outcome into the result reported to the user.
pub fn evaluate(query: &DelegationQuery, lookup: CnameLookup) -> VerificationResult {
    let challenge = query.challenge_name();
    let expected = &query.fulldomain;
    match lookup {
        CnameLookup::Found { target, records } => {
            let target = strip_root(&target).to_string();
            let valid = target.eq_ignore_ascii_case(expected);
            let message = if valid {
                format!("DNS configuration is correct! CNAME points to {target}")
            } else {
                format!("CNAME points to wrong target. Found: {target}, Expected: {expected}")
            };
            VerificationResult {
                valid,
                has_cname: true,
                cname_target: target,
                expected_target: expected.clone(),
                error_message: None,
                message,
                records,
            }
        }
        CnameLookup::NoCname => VerificationResult {
            expected_target: expected.clone(),
            message: format!(
                "No CNAME record found. Please create a CNAME record pointing to {expected}"
            ),
            ..VerificationResult::default()
        },
        CnameLookup::NxDomain => VerificationResult::failed(
            query,
            ERROR_NXDOMAIN,
            format!("No CNAME record found for {challenge}"),
        ),
        CnameLookup::Failed(reason) => VerificationResult::failed(
            query,
            ERROR_DNS,
            format!("DNS lookup failed: {reason}"),
        ),
    }
}

/// Reduce what a user typed as "their domain" to a bare lower-case name: no scheme, no leading
/// `www.`, no trailing dot.
pub fn normalize_user_domain(input: &str) -> String {
    let mut domain = input.trim();
    for prefix in ["https://", "http://", "www."] {
        domain = strip_prefix_ignore_case(domain, prefix);
    }
    strip_root(domain).to_ascii_lowercase()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

fn strip_root(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}
