//! Callback domain selection
//!
//! Resolves the configured domain names into the set of CUPTI callback
//! domains to enable at subscription time.

use crate::cupti::bindings::{self, CUpti_CallbackDomain};
use std::fmt;
use tracing::{info, warn};

/// CUPTI callback domains handled by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackDomain {
    Runtime,
    Driver,
    Resource,
    Sync,
    Nvtx,
}

impl CallbackDomain {
    pub const ALL: [CallbackDomain; 5] = [
        CallbackDomain::Runtime,
        CallbackDomain::Driver,
        CallbackDomain::Resource,
        CallbackDomain::Sync,
        CallbackDomain::Nvtx,
    ];

    /// Configuration token naming this domain
    pub fn name(self) -> &'static str {
        match self {
            CallbackDomain::Runtime => "runtime",
            CallbackDomain::Driver => "driver",
            CallbackDomain::Resource => "resource",
            CallbackDomain::Sync => "sync",
            CallbackDomain::Nvtx => "nvtx",
        }
    }

    /// Raw CUPTI domain value
    pub fn raw(self) -> CUpti_CallbackDomain {
        match self {
            CallbackDomain::Runtime => bindings::CUPTI_CB_DOMAIN_RUNTIME_API,
            CallbackDomain::Driver => bindings::CUPTI_CB_DOMAIN_DRIVER_API,
            CallbackDomain::Resource => bindings::CUPTI_CB_DOMAIN_RESOURCE,
            CallbackDomain::Sync => bindings::CUPTI_CB_DOMAIN_SYNCHRONIZE,
            CallbackDomain::Nvtx => bindings::CUPTI_CB_DOMAIN_NVTX,
        }
    }

    pub fn from_raw(domain: CUpti_CallbackDomain) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.raw() == domain)
    }
}

impl fmt::Display for CallbackDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recognized `callback_domains` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainToken {
    Domain(CallbackDomain),

    /// `none`: selects nothing
    None,
}

impl std::str::FromStr for DomainToken {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "runtime" => Ok(DomainToken::Domain(CallbackDomain::Runtime)),
            "driver" => Ok(DomainToken::Domain(CallbackDomain::Driver)),
            "resource" => Ok(DomainToken::Domain(CallbackDomain::Resource)),
            "sync" => Ok(DomainToken::Domain(CallbackDomain::Sync)),
            "nvtx" => Ok(DomainToken::Domain(CallbackDomain::Nvtx)),
            "none" => Ok(DomainToken::None),
            _ => Err(UnknownDomain(s.to_string())),
        }
    }
}

/// Token that names no known callback domain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown callback domain \"{0}\"")]
pub struct UnknownDomain(pub String);

/// Split a configured domain list on `,` and `:`
pub fn split_domain_list(list: &str) -> impl Iterator<Item = &str> {
    list.split([',', ':'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Effective set of domains to enable, in enablement order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSelection {
    domains: Vec<CallbackDomain>,
    unknown: Vec<String>,
}

impl DomainSelection {
    /// Resolve configured tokens.
    ///
    /// Event sampling bounds its context windows with resource events, so
    /// `resource` is appended when sampling is on and it was not requested.
    pub fn resolve<'a>(tokens: impl IntoIterator<Item = &'a str>, sampling_enabled: bool) -> Self {
        let mut selection = DomainSelection::default();

        for token in tokens {
            match token.parse::<DomainToken>() {
                Ok(DomainToken::Domain(domain)) => selection.add(domain),
                Ok(DomainToken::None) => {}
                Err(e) => {
                    warn!("cupti: warning: {}", e);
                    selection.unknown.push(e.0);
                }
            }
        }

        if sampling_enabled && !selection.contains(CallbackDomain::Resource) {
            info!(
                "cupti: Event sampling requires resource callbacks, adding \"resource\" callback domain."
            );
            selection.add(CallbackDomain::Resource);
        }

        selection
    }

    fn add(&mut self, domain: CallbackDomain) {
        if !self.contains(domain) {
            self.domains.push(domain);
        }
    }

    pub fn contains(&self, domain: CallbackDomain) -> bool {
        self.domains.contains(&domain)
    }

    pub fn domains(&self) -> &[CallbackDomain] {
        &self.domains
    }

    /// Tokens that were skipped
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
