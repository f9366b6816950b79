//! RPC surface and collaborator traits.
//!
//! [`RpcModule`] is what the host RPC dispatcher calls. [`AttachInfoClient`]
//! and [`TransportKeyProvider`] are supplied by the host to the module.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use tokio_util::sync::CancellationToken;

use crate::error::{AttachInfoError, SecurityRpcError, TransportKeyError};
use crate::models::Session;

/// Module ID of the agent security module.
pub const MODULE_SECURITY_AGENT: i32 = 1;

/// Issue a signed credential for the calling process.
pub const METHOD_REQUEST_CREDENTIALS: RpcMethod =
    RpcMethod::new(MODULE_SECURITY_AGENT, 101, "RequestCredentials");

/// List the authentication flavors the server accepts.
pub const METHOD_REQUEST_VALID_FLAVORS: RpcMethod =
    RpcMethod::new(MODULE_SECURITY_AGENT, 102, "RequestValidFlavors");

/// An RPC method, identified by its module and method IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RpcMethod {
    module: i32,
    id: i32,
    name: &'static str,
}

impl RpcMethod {
    #[must_use]
    pub const fn new(module: i32, id: i32, name: &'static str) -> Self {
        Self { module, id, name }
    }

    #[must_use]
    pub const fn module(&self) -> i32 {
        self.module
    }

    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Module interface consumed by the host RPC dispatcher.
#[async_trait]
pub trait RpcModule: Send + Sync {
    /// Module ID used to route calls to this module.
    fn id(&self) -> i32;

    /// Human-readable module name.
    fn name(&self) -> &'static str;

    /// Resolve a method ID of this module.
    ///
    /// # Errors
    ///
    /// `UnknownMethod` if the ID does not belong to this module.
    fn get_method(&self, id: i32) -> Result<RpcMethod, SecurityRpcError>;

    /// Handle one call and return the marshaled response.
    ///
    /// # Errors
    ///
    /// Protocol-level problems (undecodable payload, unknown method,
    /// unsupported or disallowed flavor, unreachable server). Failures the
    /// client can diagnose are returned as a status inside the response.
    async fn handle_call(
        &self,
        cancel: &CancellationToken,
        session: &Session,
        method: RpcMethod,
        request: &[u8],
    ) -> Result<Vec<u8>, SecurityRpcError>;
}

/// Source of the server-approved authentication flavors.
#[async_trait]
pub trait AttachInfoClient: Send + Sync {
    /// Fetch the raw flavor identifiers the server accepts for `system`.
    ///
    /// # Errors
    ///
    /// `Request` if the server could not be reached, `Cancelled` if `cancel` fired.
    async fn valid_auth_flavors(
        &self,
        cancel: &CancellationToken,
        system: &str,
    ) -> Result<Vec<i32>, AttachInfoError>;
}

/// Provides the agent's credential signing key.
pub trait TransportKeyProvider: Send + Sync {
    /// Returns the signing key, or `None` when running without certificates,
    /// in which case verifiers are unsigned content hashes.
    ///
    /// # Errors
    ///
    /// `BadCert` when the certificate configuration is unusable.
    fn private_key(&self) -> Result<Option<Arc<SigningKey>>, TransportKeyError>;
}
