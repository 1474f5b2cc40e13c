//! Configuration for the CUPTI service
//!
//! Read once at registration. Sources, lowest precedence first: built-in
//! defaults, `APERTURE_CUPTI_*` environment variables, explicit overrides
//! from the embedding host.

use crate::domain::split_domain_list;
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `APERTURE_CUPTI_CALLBACK_DOMAINS`
pub const ENV_PREFIX: &str = "APERTURE_CUPTI";

/// CUPTI service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuptiConfig {
    /// List of callback domains to capture, separated by `,` or `:`.
    /// Tokens: runtime, driver, resource, sync, nvtx, none
    pub callback_domains: String,

    /// Record symbol name (kernel) for runtime and driver callbacks
    pub record_symbol: bool,

    /// Record context ID for runtime and driver callbacks (currently inert)
    pub record_context: bool,

    /// CUPTI events to sample (not used by the callback service)
    pub sample_events: String,

    /// CUPTI event ID to sample; 0 disables event sampling
    pub sample_event_id: u64,
}

impl Default for CuptiConfig {
    fn default() -> Self {
        Self {
            callback_domains: "runtime:sync".to_string(),
            record_symbol: true,
            record_context: true,
            sample_events: String::new(),
            sample_event_id: 0,
        }
    }
}

impl CuptiConfig {
    /// Load from defaults and the environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(std::iter::empty::<(&str, &str)>())
    }

    /// Load from defaults, the environment and explicit `key = value` overrides
    pub fn load<'a>(
        overrides: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, config::ConfigError> {
        let defaults = CuptiConfig::default();

        let mut builder = config::Config::builder()
            .set_default("callback_domains", defaults.callback_domains)?
            .set_default("record_symbol", defaults.record_symbol)?
            .set_default("record_context", defaults.record_context)?
            .set_default("sample_events", defaults.sample_events)?
            .set_default("sample_event_id", defaults.sample_event_id)?
            .add_source(config::Environment::with_prefix(ENV_PREFIX));

        for (key, value) in overrides {
            builder = builder.set_override(key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Configured domain tokens
    pub fn domain_tokens(&self) -> impl Iterator<Item = &str> {
        split_domain_list(&self.callback_domains)
    }

    pub fn sampling_requested(&self) -> bool {
        self.sample_event_id > 0
    }
}
