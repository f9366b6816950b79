//! `AUTH_SYS` plugin construction.

use std::sync::Arc;

use agent_security_sdk::CredentialRequestFactory;
use anyhow::Context;
use tracing::info;

use crate::config::{IdentitySource, SysAuthnPluginConfig};
use crate::domain::{
    IdentityResolver, OsIdentityResolver, StaticIdentityResolver, SysCredentialFactory,
};

/// `AUTH_SYS` credential plugin.
pub struct SysAuthnPlugin;

impl SysAuthnPlugin {
    /// Build the factory to register with the agent security module.
    ///
    /// # Errors
    ///
    /// Fails if no machine name is configured and the host name cannot be read.
    pub fn factory(cfg: &SysAuthnPluginConfig) -> anyhow::Result<Arc<dyn CredentialRequestFactory>> {
        let machine_name = match &cfg.machine_name {
            Some(name) => name.clone(),
            None => hostname::get()
                .context("reading host name")?
                .into_string()
                .map_err(|raw| {
                    anyhow::anyhow!("host name {} is not valid UTF-8", raw.to_string_lossy())
                })?,
        };

        let resolver: Arc<dyn IdentityResolver> = match cfg.identity_source {
            IdentitySource::Os => Arc::new(OsIdentityResolver),
            IdentitySource::Static => Arc::new(StaticIdentityResolver::from_config(cfg)),
        };

        info!(
            machine_name = %machine_name,
            identity_source = ?cfg.identity_source,
            "Initialized sys_authn_plugin"
        );
        Ok(Arc::new(SysCredentialFactory::new(resolver, machine_name)))
    }
}
