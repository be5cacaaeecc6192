//! Delegation checks performed by the remote API's `/dns-check` endpoint.

use crate::api::DynDomainApi;
use crate::error::Error;
use crate::verify::{DelegationChecker, DelegationQuery, VerificationResult, ERROR_NETWORK};

pub struct RemoteChecker {
    api: DynDomainApi,
}

impl RemoteChecker {
    pub fn new(api: DynDomainApi) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl DelegationChecker for RemoteChecker {
    async fn check_delegation(
        &self,
        user_domain: &str,
        subdomain: &str,
        fulldomain: &str,
    ) -> Result<VerificationResult, Error> {
        let query = DelegationQuery::new(user_domain, subdomain, fulldomain)?;
        match self.api.check_delegation(&query).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::debug!("remote delegation check failed: {err}");
                Ok(VerificationResult::failed(
                    &query,
                    ERROR_NETWORK,
                    "Failed to check DNS. Please try again.".to_string(),
                ))
            }
        }
    }
}
