//! Delegation checks resolved from this host with [`trust_dns_resolver`].

use crate::config::Config;
use crate::error::Error;
use crate::verify::{evaluate, CnameLookup, DelegationChecker, DelegationQuery, VerificationResult};
use std::net::SocketAddr;
use trust_dns_proto::op::ResponseCode;
use trust_dns_proto::rr::{Name, RData, RecordType};
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::TokioAsyncResolver;

pub struct ResolverChecker {
    resolver: TokioAsyncResolver,
}

impl ResolverChecker {
    /// Use the configured [`nameservers`][Config::nameservers], or the host's resolver
    /// configuration when none are set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] if the resolver can't be built.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        if config.nameservers.is_empty() {
            Self::from_system_conf()
        } else {
            Self::with_nameservers(&config.nameservers)
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::Verification`] if the host's resolver configuration can't be read.
    pub fn from_system_conf() -> Result<Self, Error> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().map_err(|err| {
            Error::Verification(format!("can't load system resolver configuration: {err}"))
        })?;
        Ok(Self { resolver })
    }

    /// Query only the given nameservers, over UDP with TCP fallback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] if the resolver can't be built.
    pub fn with_nameservers(nameservers: &[SocketAddr]) -> Result<Self, Error> {
        let mut group = NameServerConfigGroup::new();
        for ns in nameservers {
            group.merge(NameServerConfigGroup::from_ips_clear(
                &[ns.ip()],
                ns.port(),
                true,
            ));
        }
        let config = ResolverConfig::from_parts(None, vec![], group);
        let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default())
            .map_err(|err| Error::Verification(format!("can't build resolver: {err}")))?;
        Ok(Self { resolver })
    }

    async fn lookup_cname(&self, challenge: &str) -> CnameLookup {
        let name = match Name::from_ascii(format!("{challenge}.")) {
            Ok(name) => name,
            Err(err) => return CnameLookup::Failed(err.to_string()),
        };
        match self.resolver.lookup(name.clone(), RecordType::CNAME).await {
            Ok(lookup) => {
                let target = lookup.iter().find_map(|rdata| match rdata {
                    RData::CNAME(target) => Some(target.to_utf8()),
                    _ => None,
                });
                match target {
                    Some(target) => CnameLookup::Found {
                        target,
                        records: self.addresses(name).await,
                    },
                    None => CnameLookup::NoCname,
                }
            }
            Err(err) => classify(&err),
        }
    }

    /// Addresses the challenge name resolves to, best-effort.
    async fn addresses(&self, name: Name) -> Vec<String> {
        match self.resolver.lookup_ip(name).await {
            Ok(ips) => ips.iter().map(|ip| ip.to_string()).collect(),
            Err(err) => {
                tracing::debug!("no addresses for challenge name: {err}");
                Vec::new()
            }
        }
    }
}

fn classify(err: &ResolveError) -> CnameLookup {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. }
            if *response_code == ResponseCode::NXDomain =>
        {
            CnameLookup::NxDomain
        }
        ResolveErrorKind::NoRecordsFound { .. } => CnameLookup::NoCname,
        _ => CnameLookup::Failed(err.to_string()),
    }
}

#[async_trait::async_trait]
impl DelegationChecker for ResolverChecker {
    async fn check_delegation(
        &self,
        user_domain: &str,
        subdomain: &str,
        fulldomain: &str,
    ) -> Result<VerificationResult, Error> {
        let query = DelegationQuery::new(user_domain, subdomain, fulldomain)?;
        let challenge = query.challenge_name();
        tracing::debug!(
            "checking CNAME of \"{challenge}\", expecting \"{}\"",
            query.fulldomain
        );
        let lookup = self.lookup_cname(&challenge).await;
        Ok(evaluate(&query, lookup))
    }
}
