//! Error types for the CUPTI service

use crate::cupti::bindings::{self, CUptiResult};
use crate::domain::CallbackDomain;
use thiserror::Error;

/// A CUPTI call returned a non-success code.
///
/// `Copy` and allocation-free so it can be produced inside callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cupti: {call}: error: {}", bindings::result_name(*code))]
pub struct CuptiError {
    /// Name of the failing CUPTI function
    pub call: &'static str,

    /// Raw result code
    pub code: CUptiResult,
}

impl CuptiError {
    pub const fn new(call: &'static str, code: CUptiResult) -> Self {
        Self { call, code }
    }

    /// Map a raw result code to `Ok(())` or an error tagged with `call`
    pub fn check(call: &'static str, code: CUptiResult) -> Result<(), CuptiError> {
        if code == bindings::CUPTI_SUCCESS {
            Ok(())
        } else {
            Err(Self::new(call, code))
        }
    }
}

/// Failures that abort registration of the service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid cupti configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("subscription failed: {message}")]
    Subscribe { message: String, source: CuptiError },

    #[error("enabling \"{domain}\" callback domain failed: {message}")]
    EnableDomain {
        domain: CallbackDomain,
        message: String,
        source: CuptiError,
    },
}

impl ServiceError {
    /// Underlying vendor error, if the failure came from CUPTI
    pub fn cupti_error(&self) -> Option<CuptiError> {
        match self {
            ServiceError::Config(_) => None,
            ServiceError::Subscribe { source, .. } | ServiceError::EnableDomain { source, .. } => {
                Some(*source)
            }
        }
    }
}
