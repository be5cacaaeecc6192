use crate::error::Error;
use crate::storage::{self, DynStorage, FileStorage, InMemoryStorage};
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use reqwest::Url;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub type Shared = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub api_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    pub api_timeout: Option<Duration>,
    pub state_path: Option<String>,
    pub dashboard: DashboardCredentials,
    #[serde(default)]
    pub dns_check: DnsCheckMode,
    #[serde(default)]
    pub nameservers: Vec<SocketAddr>,
}

/// The single username/password pair accepted by the [session gate][crate::session].
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct DashboardCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for DashboardCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where delegation checks are performed.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DnsCheckMode {
    /// Resolve the CNAME locally.
    #[default]
    Resolver,
    /// Ask the remote API's `/dns-check` endpoint.
    Remote,
}

fn default_api_key() -> String {
    "acme-dns-ui-key".to_string()
}

lazy_static! {
    // fc00::/7 (RFC 4193). Ipv6Addr::is_unique_local is still unstable.
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Config {
    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, otherwise as [`Config::try_from_json`].
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = fs::read_to_string(p)?;
        Self::try_from_json(&contents)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] for malformed JSON, or the errors of
    /// [`Config::parsed_api_url`]. Returns [`Error::InsecureApiUrl`] for plain http to a host that
    /// isn't local.
    pub fn try_from_json(contents: &str) -> Result<Self, Error> {
        let conf: Config = serde_json::from_str(contents)?;
        conf.api_url_is_secure()?;
        Ok(conf)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidApiUrl`] unless `api_url` is an http(s) URL with a host.
    pub fn parsed_api_url(&self) -> Result<Url, Error> {
        let url = Url::parse(&self.api_url)
            .map_err(|_| Error::InvalidApiUrl(self.api_url.clone()))?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(url),
            _ => Err(Error::InvalidApiUrl(self.api_url.clone())),
        }
    }

    /// Open the configured storage port: file-backed when `state_path` is set, otherwise
    /// in-memory.
    ///
    /// # Errors
    ///
    /// Fails as [`FileStorage::try_from_file`] does when `state_path` is set.
    pub async fn storage(&self) -> Result<DynStorage, Error> {
        Ok(match &self.state_path {
            Some(path) => storage::shared(FileStorage::try_from_file(path).await?),
            None => {
                tracing::warn!("no state_path configured, credentials will not be kept");
                storage::shared(InMemoryStorage::default())
            }
        })
    }

    fn api_url_is_secure(&self) -> Result<(), Error> {
        let url = self.parsed_api_url()?;
        if url.scheme() == "https" || host_is_local(&url) {
            return Ok(());
        }
        Err(Error::InsecureApiUrl(self.api_url.clone()))
    }
}

/// Whether `url` points at `localhost`, a loopback address, or a private network address.
pub fn host_is_local(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let host = host.trim_start_matches('[').trim_end_matches(']');
    match IpAddr::from_str(host) {
        Ok(IpAddr::V4(ip)) => ip.is_loopback() || ip.is_private(),
        Ok(IpAddr::V6(ip)) => ip.is_loopback() || IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(ip)),
        Err(_) => false,
    }
}
