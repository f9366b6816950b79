//! `AUTH_AM` plugin construction.

use std::sync::Arc;

use agent_security_sdk::CredentialRequestFactory;
use tracing::info;

use crate::client::AccessManagerClient;
use crate::config::AmAuthnPluginConfig;
use crate::domain::AmCredentialFactory;

/// `AUTH_AM` credential plugin.
pub struct AmAuthnPlugin;

impl AmAuthnPlugin {
    /// Build the factory to register with the agent security module.
    #[must_use]
    pub fn factory(
        cfg: &AmAuthnPluginConfig,
        client: Arc<dyn AccessManagerClient>,
    ) -> Arc<dyn CredentialRequestFactory> {
        info!(max_ticket_len = cfg.max_ticket_len, "Initialized am_authn_plugin");
        Arc::new(AmCredentialFactory::new(client, cfg.max_ticket_len))
    }
}
