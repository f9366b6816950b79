//! Agent Security SDK
//!
//! This crate provides the public contracts of the agent security module:
//!
//! - [`AuthFlavor`] - Authentication mechanism identifiers
//! - [`CredentialRequest`] / [`CredentialRequestFactory`] - Plugin API for
//!   authentication mechanisms
//! - [`RpcModule`] - Surface exposed to the host RPC dispatcher
//! - [`AttachInfoClient`] / [`TransportKeyProvider`] - Collaborators the
//!   module depends on
//! - [`token`] - Verifier computation and token verification
//!
//! ## Usage
//!
//! A host dispatcher resolves the method and forwards the raw request:
//!
//! ```ignore
//! use agent_security_sdk::RpcModule;
//!
//! let method = module.get_method(method_id)?;
//! let response = module.handle_call(&cancel, &session, method, &request).await?;
//! ```

pub mod api;
pub mod error;
pub mod flavor;
pub mod models;
pub mod plugin_api;
pub mod token;

// Re-export main types at crate root
pub use api::{
    AttachInfoClient, METHOD_REQUEST_CREDENTIALS, METHOD_REQUEST_VALID_FLAVORS,
    MODULE_SECURITY_AGENT, RpcMethod, RpcModule, TransportKeyProvider,
};
pub use error::{
    AttachInfoError, CredentialError, SecurityRpcError, TokenError, TransportKeyError,
};
pub use flavor::AuthFlavor;
pub use models::{
    AuthArgs, ClientUserMapEntry, Credential, CredentialConfig, CredentialStatus, GetCredResp,
    GetValidAuthResp, PeerCredentials, Session, Sys, Token,
};
pub use plugin_api::{CredentialRequest, CredentialRequestFactory};

pub use ed25519_dalek::{SigningKey, VerifyingKey};
