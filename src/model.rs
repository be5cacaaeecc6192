//! Domain records and the JSON payloads exchanged with the remote ACME-DNS API.

use base64::engine::general_purpose;
use base64::{alphabet, engine, DecodeError, Engine};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;

/// One ACME-DNS registration, as held in the
/// [credential store][crate::credential_store::CredentialStore].
///
/// `fulldomain` is the key shared by the server and local views. `password` is only ever
/// returned by the server at registration time, so the local copy is its only durable holder.
/// `display_name` and `last_active_at` are local-only and never sent to the server.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRecord {
    pub subdomain: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub fulldomain: String,
    #[serde(default)]
    pub allowfrom: Vec<String>,
    #[serde(rename = "domain_name", default)]
    pub display_name: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(rename = "last_active", default, with = "time::serde::rfc3339::option")]
    pub last_active_at: Option<OffsetDateTime>,
}

impl DomainRecord {
    /// Build a record from a `/domains` entry. The server never returns passwords, so the
    /// result always has an empty one.
    pub fn from_remote(remote: RemoteDomain) -> Self {
        Self {
            subdomain: remote.subdomain,
            username: remote.username,
            password: String::new(),
            fulldomain: remote.fulldomain,
            allowfrom: remote.allowfrom.unwrap_or_default(),
            display_name: None,
            created_at: remote.created_at.and_then(RemoteTimestamp::into_datetime),
            updated_at: remote.updated_at.and_then(RemoteTimestamp::into_datetime),
            last_active_at: None,
        }
    }

    /// Build a record from a successful `/register` response, stamping creation time locally.
    pub fn from_registration(
        registration: Registration,
        display_name: Option<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            subdomain: registration.subdomain,
            username: registration.username,
            password: registration.password,
            fulldomain: registration.fulldomain,
            allowfrom: registration.allowfrom.unwrap_or_default(),
            display_name,
            created_at: Some(now),
            updated_at: Some(now),
            last_active_at: None,
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// The label to show for this record: its display name, or the `fulldomain` when unnamed.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.fulldomain)
    }
}

/// An entry of the `GET /domains` response.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteDomain {
    pub subdomain: String,
    pub username: String,
    pub fulldomain: String,
    #[serde(default)]
    pub allowfrom: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<RemoteTimestamp>,
    #[serde(default)]
    pub updated_at: Option<RemoteTimestamp>,
}

/// Servers report timestamps either as unix seconds or as RFC 3339 text.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RemoteTimestamp {
    Unix(i64),
    Text(String),
}

impl RemoteTimestamp {
    /// Unix zero is treated as "unset".
    pub fn into_datetime(self) -> Option<OffsetDateTime> {
        match self {
            RemoteTimestamp::Unix(0) => None,
            RemoteTimestamp::Unix(secs) => OffsetDateTime::from_unix_timestamp(secs).ok(),
            RemoteTimestamp::Text(text) => OffsetDateTime::parse(
                &text,
                &time::format_description::well_known::Rfc3339,
            )
            .ok(),
        }
    }
}

/// Body of `POST /register`.
#[skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub allowfrom: Option<Vec<String>>,
}

/// Response of `POST /register`. This is the only time the server reveals `password`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub fulldomain: String,
    #[serde(default)]
    pub allowfrom: Option<Vec<String>>,
}

/// Body of `POST /update`.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRecordRequest {
    pub subdomain: String,
    pub txt: String,
}

#[derive(thiserror::Error, Debug)]
pub enum TxtValidationError {
    #[error("invalid encoding: {0}")]
    InvalidEncoding(DecodeError),
    #[error("invalid decoded length: found {actual} bytes, expected {expected}")]
    InvalidDecodedLength { actual: usize, expected: usize },
}

const DNS01_DECODED_LEN_BYTES: usize = 32;

lazy_static! {
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

impl UpdateRecordRequest {
    pub fn valid_dns01(&self) -> Result<(), TxtValidationError> {
        match BASE64_ENGINE.decode(&self.txt) {
            Ok(raw) => match raw.len() {
                DNS01_DECODED_LEN_BYTES => Ok(()),
                _ => Err(TxtValidationError::InvalidDecodedLength {
                    actual: raw.len(),
                    expected: DNS01_DECODED_LEN_BYTES,
                }),
            },
            Err(err) => Err(TxtValidationError::InvalidEncoding(err)),
        }
    }
}

/// `status` field of the `GET /health` response.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Online,
    Offline,
    Error,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: HealthState,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn online() -> Self {
        Self {
            status: HealthState::Online,
            message: None,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            status: HealthState::Error,
            message: Some("Server unreachable".to_string()),
        }
    }
}

/// Two-state server indicator derived from a [`HealthStatus`]: only an explicit `error` counts
/// as offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Online,
    Offline,
}

impl From<&HealthStatus> for ServerStatus {
    fn from(health: &HealthStatus) -> Self {
        match health.status {
            HealthState::Error => ServerStatus::Offline,
            HealthState::Online | HealthState::Offline => ServerStatus::Online,
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStatus::Online => write!(f, "online"),
            ServerStatus::Offline => write!(f, "offline"),
        }
    }
}
