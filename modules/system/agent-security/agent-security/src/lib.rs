//! Agent Security Module
//!
//! Accepts credential requests from local clients, routes them to the
//! authentication plugin registered for the requested flavor, checks the
//! flavor against the set the server allows, and returns a signed
//! credential, optionally served from a per-identity cache.
//!
//! Exposes an [`RpcModule`](agent_security_sdk::RpcModule) for the host RPC
//! dispatcher; see [`module::AgentSecurity`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod infra;
pub mod module;
pub mod registry;

pub use config::{AgentSecurityConfig, TransportConfig};
pub use module::{AgentSecurity, AgentSecurityDeps};
pub use registry::{FlavorParseError, FlavorRegistry, parse_flavor_names};
