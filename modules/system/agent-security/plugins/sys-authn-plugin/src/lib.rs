#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `AUTH_SYS` Credential Plugin
//!
//! Issues credentials carrying the local OS identity of the process on the
//! other end of the agent socket. The uid/gid come from the transport, never
//! from the client payload.
//!
//! ## Identity sources
//!
//! - **`os`** (default): user, primary group and supplementary groups are
//!   read from the host's account database.
//! - **`static`**: names come from the plugin configuration. Useful for
//!   containers without an account database and for tests.
//!
//! ## Configuration
//!
//! ```yaml
//! sys_authn_plugin:
//!   machine_name: "storage-node-1"   # defaults to the host name
//!   identity_source: static
//!   users:
//!     - uid: 1000
//!       name: alice
//!       groups: [video]
//!   groups:
//!     - gid: 1000
//!       name: staff
//! ```

pub mod config;
pub mod domain;
pub mod module;

pub use module::SysAuthnPlugin;
