//! [`DomainApi`] over HTTP(S), using [`reqwest`].

use crate::api::response::{check_status, reason};
use crate::api::DomainApi;
use crate::config::{host_is_local, Config};
use crate::error::Error;
use crate::model::{
    HealthState, HealthStatus, Registration, RegistrationRequest, RemoteDomain,
    UpdateRecordRequest,
};
use crate::verify::{DelegationQuery, VerificationResult};
use reqwest::{RequestBuilder, StatusCode};

const USER_AGENT: &str = concat!("acmedash/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpDomainApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpDomainApi {
    /// Build a client for the API configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidApiUrl`] if the configured URL can't be parsed, or
    /// [`Error::Network`] if the underlying HTTP client can't be constructed.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let url = config.parsed_api_url()?;
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.api_timeout {
            builder = builder.timeout(timeout);
        }
        if host_is_local(&url) {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|err| Error::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request, returning the status and body text. Only transport failures are errors.
    async fn execute(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<(StatusCode, String), Error> {
        tracing::debug!("{action} {}", self.base_url);
        let response = request.send().await.map_err(|err| {
            tracing::debug!("{action} failed: {err}");
            Error::Network(err.to_string())
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| Error::Network(err.to_string()))?;
        tracing::debug!("{action} answered {status}");
        Ok((status, body))
    }
}

#[async_trait::async_trait]
impl DomainApi for HttpDomainApi {
    async fn list_domains(&self) -> Result<Vec<RemoteDomain>, Error> {
        let request = self
            .client
            .get(self.endpoint("/domains"))
            .header("X-Api-Key", &self.api_key);
        let (status, body) = self.execute(request, "GET /domains").await?;
        check_status(status, &body)?;
        let domains: Option<Vec<RemoteDomain>> = serde_json::from_str(&body)?;
        Ok(domains.unwrap_or_default())
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<Registration, Error> {
        let request = self.client.post(self.endpoint("/register")).json(request);
        let (status, body) = self.execute(request, "POST /register").await?;
        check_status(status, &body)?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn update_txt(
        &self,
        username: &str,
        password: &str,
        update: &UpdateRecordRequest,
    ) -> Result<(), Error> {
        let request = self
            .client
            .post(self.endpoint("/update"))
            .header("X-Api-User", username)
            .header("X-Api-Key", password)
            .json(update);
        let (status, body) = self.execute(request, "POST /update").await?;
        check_status(status, &body)
    }

    async fn health(&self) -> Result<HealthStatus, Error> {
        let request = self.client.get(self.endpoint("/health"));
        let (status, body) = self.execute(request, "GET /health").await?;
        if !status.is_success() {
            let message = serde_json::from_str::<HealthStatus>(&body)
                .ok()
                .and_then(|health| health.message)
                .unwrap_or_else(|| reason(status, &body));
            return Ok(HealthStatus {
                status: HealthState::Error,
                message: Some(message),
            });
        }
        // The stock server answers an empty 200.
        Ok(serde_json::from_str(&body).unwrap_or_else(|_| HealthStatus::online()))
    }

    async fn check_delegation(&self, query: &DelegationQuery) -> Result<VerificationResult, Error> {
        let request = self.client.post(self.endpoint("/dns-check")).json(query);
        let (status, body) = self.execute(request, "POST /dns-check").await?;
        // Input errors come back as a 400 that still carries a result body.
        if let Ok(result) = serde_json::from_str::<VerificationResult>(&body) {
            return Ok(result);
        }
        check_status(status, &body)?;
        Err(Error::Verification(format!(
            "unexpected response from delegation check endpoint: {}",
            reason(status, &body)
        )))
    }
}
