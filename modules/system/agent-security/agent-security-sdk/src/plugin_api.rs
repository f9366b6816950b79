//! Plugin API for authentication mechanisms.
//!
//! Each mechanism provides a [`CredentialRequestFactory`] bound to exactly one
//! [`AuthFlavor`]. The factory produces a fresh [`CredentialRequest`] per call;
//! the dispatcher drives it through `init` and then `sign`.

use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use tokio_util::sync::CancellationToken;

use crate::error::CredentialError;
use crate::flavor::AuthFlavor;
use crate::models::{Credential, CredentialConfig, Session};

/// Produces credential requests for one flavor.
pub trait CredentialRequestFactory: Send + Sync {
    /// The flavor this factory serves. Must be unique among registered factories.
    fn flavor(&self) -> AuthFlavor;

    /// Allocate an uninitialized request.
    fn new_request(&self) -> Box<dyn CredentialRequest>;
}

/// One authentication attempt.
///
/// Owned by the call that created it and never shared between calls.
#[async_trait]
pub trait CredentialRequest: Send + Sync {
    /// Bind request-scoped state.
    ///
    /// The cache key must be derived here from `session`, which the transport
    /// vouches for, and never from `payload` alone: a key a client can choose
    /// would let it read credentials cached for another identity.
    ///
    /// # Errors
    ///
    /// `Status` for conditions reported to the client as a response status;
    /// any other variant fails the call.
    fn init(
        &mut self,
        config: &CredentialConfig,
        session: &Session,
        payload: &[u8],
        signing_key: Option<Arc<SigningKey>>,
    ) -> Result<(), CredentialError>;

    /// Contact the identity source and produce a signed credential.
    ///
    /// May be slow; must stop when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Any failure to obtain or sign the identity.
    async fn sign(&self, cancel: &CancellationToken) -> Result<Credential, CredentialError>;

    /// Cache key for this request. Stable once `init` succeeded.
    fn key(&self) -> &str;
}
