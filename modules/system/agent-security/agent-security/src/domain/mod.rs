//! Domain layer for the agent security module.

pub mod credential_cache;
pub mod error;
pub mod lifecycle;
pub mod local_client;
pub mod service;
pub mod valid_flavors;

pub use credential_cache::{CachedCredential, CredentialCache, CredentialSigner};
pub use error::DomainError;
pub use lifecycle::{CredentialLifecycle, RequestState};
pub use local_client::SecurityModuleLocalClient;
pub use service::Service;
pub use valid_flavors::ValidFlavorSet;
