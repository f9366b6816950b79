#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `AUTH_AM` Credential Plugin
//!
//! The client presents an opaque access-manager ticket; the agent asks an
//! [`AccessManagerClient`] who the ticket belongs to and issues a signed
//! credential carrying that principal.
//!
//! Credentials are cached per peer uid/gid and ticket digest, so a ticket
//! presented from another local account never hits someone else's entry.

pub mod client;
pub mod config;
pub mod domain;
pub mod models;
pub mod module;

pub use client::{AccessManagerClient, AccessManagerError, AmPrincipal, StaticAccessManager};
pub use models::AmIdentity;
pub use module::AmAuthnPlugin;
