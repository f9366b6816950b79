//! State machine around a single credential request.

use std::fmt;
use std::sync::Arc;

use agent_security_sdk::{Credential, CredentialConfig, CredentialRequest, Session, SigningKey};
use tokio_util::sync::CancellationToken;

use super::credential_cache::CredentialSigner;
use super::error::DomainError;

/// Where a request is in its `New -> Initialized -> Signed` progression.
///
/// `Failed` is terminal and reachable from either step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    New,
    Initialized,
    Signed,
    Failed,
}

impl RequestState {
    fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Initialized => "initialized",
            Self::Signed => "signed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns one plugin request and enforces that it is initialized exactly once
/// before it is signed.
pub struct CredentialLifecycle {
    request: Box<dyn CredentialRequest>,
    state: RequestState,
}

impl CredentialLifecycle {
    #[must_use]
    pub fn new(request: Box<dyn CredentialRequest>) -> Self {
        Self {
            request,
            state: RequestState::New,
        }
    }

    #[must_use]
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Cache key of the underlying request. Meaningful once initialized.
    #[must_use]
    pub fn key(&self) -> &str {
        self.request.key()
    }

    /// # Errors
    ///
    /// - `Lifecycle` if the request is not `New`
    /// - `Init` with the plugin's error otherwise
    pub fn init(
        &mut self,
        config: &CredentialConfig,
        session: &Session,
        payload: &[u8],
        signing_key: Option<Arc<SigningKey>>,
    ) -> Result<(), DomainError> {
        self.expect(RequestState::New)?;
        match self.request.init(config, session, payload, signing_key) {
            Ok(()) => {
                self.state = RequestState::Initialized;
                Ok(())
            }
            Err(e) => {
                self.state = RequestState::Failed;
                Err(DomainError::Init(e))
            }
        }
    }

    /// Sign through `signer`, which may serve a cached credential.
    ///
    /// # Errors
    ///
    /// - `Lifecycle` if the request is not `Initialized`
    /// - whatever `signer` reports
    pub async fn sign(
        &mut self,
        signer: &CredentialSigner,
        cancel: &CancellationToken,
    ) -> Result<Credential, DomainError> {
        self.expect(RequestState::Initialized)?;
        match signer.sign(cancel, self.request.as_ref()).await {
            Ok(credential) => {
                self.state = RequestState::Signed;
                Ok(credential)
            }
            Err(e) => {
                self.state = RequestState::Failed;
                Err(e)
            }
        }
    }

    fn expect(&self, expected: RequestState) -> Result<(), DomainError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DomainError::Lifecycle {
                state: self.state.as_str(),
                expected: expected.as_str(),
            })
        }
    }
}
