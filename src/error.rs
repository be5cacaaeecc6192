//! Error types.

use crate::model::TxtValidationError;

/// Error enumerates the possible dashboard error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when the remote ACME-DNS API can't be reached, or the connection fails before a
    /// response status is received.
    #[error("network error: {0}")]
    Network(String),

    /// Returned when the remote API rejects the supplied credentials (HTTP 401/403), or when an
    /// update is attempted for a record whose password is not held locally.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Returned by local operations that reference a `fulldomain` absent from the
    /// [credential store][crate::credential_store::CredentialStore].
    #[error("no domain registered as \"{0}\"")]
    NotFound(String),

    /// Returned when [registration][crate::reconciler::DomainCache::register_domain] fails
    /// remotely, returns unusable data, or is given an invalid `allowfrom` network.
    #[error("registration failed: {0}")]
    Registration(String),

    /// Returned when a delegation check can't be attempted at all. A check that completes and
    /// finds the CNAME missing or wrong is a normal
    /// [`VerificationResult`][crate::verify::VerificationResult], not an error.
    #[error("verification could not complete: {0}")]
    Verification(String),

    /// Returned for any other non-success HTTP status from the remote API.
    #[error("request rejected with HTTP {status}: {reason}")]
    Rejected { status: u16, reason: String },

    /// Returned when a TXT value is not a valid [RFC-8555][RFC-8555] [DNS-01] challenge
    /// response. These values MUST be a BASE64 encoded 32 byte SHA256 digest.
    ///
    /// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
    /// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
    #[error("TXT value is not a valid DNS-01 challenge response: {0}")]
    InvalidChallenge(#[from] TxtValidationError),

    /// Returned when the configured [`Config::api_url`][crate::config::Config::api_url] would
    /// send credentials in clear text to a public host.
    #[error("API URL ({0}) must use https unless it points at a loopback or private address")]
    InsecureApiUrl(String),

    /// Returned when the configured API URL can't be parsed.
    #[error("invalid API URL \"{0}\"")]
    InvalidApiUrl(String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g.
    /// [loading a `Config`][crate::config::Config::try_from_file], or reading back the
    /// [credential store][crate::credential_store::CredentialStore]) fails due to invalid JSON.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}
