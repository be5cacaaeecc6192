//! Test helpers: a scripted [`DomainApi`] that records every call.

use std::sync::Mutex;

use crate::api::DomainApi;
use crate::error::Error;
use crate::model::{
    HealthStatus, Registration, RegistrationRequest, RemoteDomain, RemoteTimestamp,
    UpdateRecordRequest,
};
use crate::verify::{DelegationQuery, VerificationResult};

/// Scripted outcome of an `/update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Accept,
    RejectCredentials,
    Unreachable,
}

pub struct MockDomainApi {
    domains: Mutex<Option<Vec<RemoteDomain>>>,
    registration: Mutex<Option<Registration>>,
    update_outcome: Mutex<UpdateOutcome>,
    health: Mutex<Option<HealthStatus>>,
    delegation: Mutex<Option<Result<VerificationResult, Error>>>,
    calls: Mutex<Vec<&'static str>>,
    registrations: Mutex<Vec<RegistrationRequest>>,
    updates: Mutex<Vec<(String, String, UpdateRecordRequest)>>,
    delegation_queries: Mutex<Vec<DelegationQuery>>,
}

impl MockDomainApi {
    /// A mock where every call fails as unreachable until scripted otherwise.
    pub fn new() -> Self {
        Self {
            domains: Mutex::new(None),
            registration: Mutex::new(None),
            update_outcome: Mutex::new(UpdateOutcome::Unreachable),
            health: Mutex::new(None),
            delegation: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            delegation_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn set_domains(&self, domains: Vec<RemoteDomain>) {
        *self.domains.lock().unwrap() = Some(domains);
    }

    pub fn fail_list(&self) {
        *self.domains.lock().unwrap() = None;
    }

    pub fn set_registration(&self, registration: Registration) {
        *self.registration.lock().unwrap() = Some(registration);
    }

    pub fn set_update_outcome(&self, outcome: UpdateOutcome) {
        *self.update_outcome.lock().unwrap() = outcome;
    }

    pub fn set_health(&self, health: HealthStatus) {
        *self.health.lock().unwrap() = Some(health);
    }

    /// Script the result of the next delegation check.
    pub fn set_delegation_result(&self, result: Result<VerificationResult, Error>) {
        *self.delegation.lock().unwrap() = Some(result);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<RegistrationRequest> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, String, UpdateRecordRequest)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn delegation_queries(&self) -> Vec<DelegationQuery> {
        self.delegation_queries.lock().unwrap().clone()
    }

    fn record_call(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

fn unreachable() -> Error {
    Error::Network("connection refused".to_string())
}

#[async_trait::async_trait]
impl DomainApi for MockDomainApi {
    async fn list_domains(&self) -> Result<Vec<RemoteDomain>, Error> {
        self.record_call("list_domains");
        self.domains.lock().unwrap().clone().ok_or_else(unreachable)
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<Registration, Error> {
        self.record_call("register");
        self.registrations.lock().unwrap().push(request.clone());
        self.registration.lock().unwrap().clone().ok_or_else(unreachable)
    }

    async fn update_txt(
        &self,
        username: &str,
        password: &str,
        update: &UpdateRecordRequest,
    ) -> Result<(), Error> {
        self.record_call("update_txt");
        self.updates.lock().unwrap().push((
            username.to_string(),
            password.to_string(),
            update.clone(),
        ));
        match *self.update_outcome.lock().unwrap() {
            UpdateOutcome::Accept => Ok(()),
            UpdateOutcome::RejectCredentials => Err(Error::Auth("forbidden".to_string())),
            UpdateOutcome::Unreachable => Err(unreachable()),
        }
    }

    async fn health(&self) -> Result<HealthStatus, Error> {
        self.record_call("health");
        self.health.lock().unwrap().clone().ok_or_else(unreachable)
    }

    async fn check_delegation(&self, query: &DelegationQuery) -> Result<VerificationResult, Error> {
        self.record_call("check_delegation");
        self.delegation_queries.lock().unwrap().push(query.clone());
        self.delegation
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(unreachable()))
    }
}

/// A `/domains` entry as the server would return it.
pub fn remote_domain(subdomain: &str, base: &str) -> RemoteDomain {
    RemoteDomain {
        subdomain: subdomain.to_string(),
        username: format!("user-{subdomain}"),
        fulldomain: format!("{subdomain}.{base}"),
        allowfrom: Some(vec![]),
        created_at: Some(RemoteTimestamp::Unix(1_700_000_000)),
        updated_at: Some(RemoteTimestamp::Unix(1_700_000_500)),
    }
}

/// A `/register` response.
pub fn registration(subdomain: &str, username: &str, password: &str, base: &str) -> Registration {
    Registration {
        subdomain: subdomain.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        fulldomain: format!("{subdomain}.{base}"),
        allowfrom: None,
    }
}
