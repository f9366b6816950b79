//! Domain layer for the `AUTH_SYS` plugin.

pub mod identity;
pub mod request;

pub use identity::{IdentityResolver, OsIdentityResolver, StaticIdentityResolver, UserIdentity};
pub use request::{SysCredentialFactory, SysCredentialRequest};
