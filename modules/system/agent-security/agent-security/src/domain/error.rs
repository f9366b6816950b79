//! Domain errors for the agent security module.

use agent_security_sdk::{AuthFlavor, CredentialError, SecurityRpcError};
use item_cache::CacheError;

/// Internal domain errors.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("failed to decode request payload: {0}")]
    MalformedPayload(String),

    #[error("unknown method {method} for module {module}")]
    UnknownMethod { module: i32, method: i32 },

    #[error("no credential request factory for flavor {0}")]
    UnsupportedFlavor(String),

    #[error("flavor {0} is not allowed by the server")]
    FlavorNotAllowed(AuthFlavor),

    #[error("error retrieving auth flavors from server: {0}")]
    AttachInfo(String),

    #[error("server returned no usable authentication flavors")]
    NoValidFlavors,

    #[error("unable to initialize credential request: {0}")]
    Init(CredentialError),

    #[error("credential acquisition failed: {0}")]
    Acquisition(CredentialError),

    #[error("credential request is {state}, expected {expected}")]
    Lifecycle {
        state: &'static str,
        expected: &'static str,
    },

    #[error("signing key unavailable: {0}")]
    SigningKey(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CacheError<CredentialError>> for DomainError {
    fn from(e: CacheError<CredentialError>) -> Self {
        match e {
            CacheError::Create(CredentialError::Cancelled) | CacheError::Cancelled => {
                Self::Cancelled
            }
            CacheError::Create(inner) => Self::Acquisition(inner),
            CacheError::Abandoned(key) => Self::Acquisition(CredentialError::Authority(format!(
                "creation of credential `{key}` was abandoned"
            ))),
            mismatch @ CacheError::KeyMismatch { .. } => Self::Internal(mismatch.to_string()),
        }
    }
}

impl From<DomainError> for SecurityRpcError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::MalformedPayload(msg) => Self::UnmarshalingPayload(msg),
            DomainError::UnknownMethod { module, method } => Self::UnknownMethod { module, method },
            DomainError::UnsupportedFlavor(name) => Self::UnsupportedFlavor(name),
            DomainError::FlavorNotAllowed(flavor) => Self::FlavorNotAllowed(flavor),
            DomainError::AttachInfo(msg) => Self::AttachInfo(msg),
            DomainError::NoValidFlavors => {
                Self::AttachInfo("server returned no usable authentication flavors".to_owned())
            }
            DomainError::Init(inner) | DomainError::Acquisition(inner) => {
                Self::CredentialRequest(inner.to_string())
            }
            DomainError::Cancelled => Self::CredentialRequest("request cancelled".to_owned()),
            e @ (DomainError::Lifecycle { .. } | DomainError::SigningKey(_)) => {
                Self::Internal(e.to_string())
            }
            DomainError::Internal(msg) => Self::Internal(msg),
        }
    }
}
