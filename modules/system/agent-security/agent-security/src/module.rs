//! Agent security module.

use std::sync::{Arc, OnceLock};

use agent_security_sdk::{
    AttachInfoClient, CredentialRequestFactory, RpcModule, TransportKeyProvider,
};
use tracing::info;

use crate::config::AgentSecurityConfig;
use crate::domain::local_client::MODULE_NAME;
use crate::domain::{SecurityModuleLocalClient, Service};
use crate::infra::KeyFileProvider;
use crate::registry::FlavorRegistry;

/// Collaborators supplied by the host.
pub struct AgentSecurityDeps {
    /// One factory per compiled-in authentication plugin.
    pub factories: Vec<Arc<dyn CredentialRequestFactory>>,
    pub attach_info: Arc<dyn AttachInfoClient>,
    /// Overrides the key file named in the transport config.
    pub keys: Option<Arc<dyn TransportKeyProvider>>,
}

/// Agent Security module.
///
/// This module:
/// 1. Builds the flavor registry from the compiled-in plugin factories
/// 2. Fetches the server's valid flavors lazily, on the first call that needs them
/// 3. Routes each call to the plugin serving the requested flavor
#[derive(Default)]
pub struct AgentSecurity {
    service: OnceLock<Arc<Service>>,
}

impl AgentSecurity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the module and return the surface for the host RPC dispatcher.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when called twice.
    ///
    /// # Panics
    ///
    /// Panics if two factories report the same flavor.
    #[tracing::instrument(skip_all, fields(system))]
    pub fn init(
        &self,
        cfg: AgentSecurityConfig,
        deps: AgentSecurityDeps,
    ) -> anyhow::Result<Arc<dyn RpcModule>> {
        cfg.validate()?;
        tracing::Span::current().record("system", cfg.system_name.as_str());
        info!(system = %cfg.system_name, "Initializing {MODULE_NAME}");

        let registry = FlavorRegistry::build(deps.factories);
        info!(flavors = ?registry.flavors(), "Registered credential request factories");

        let keys = deps
            .keys
            .unwrap_or_else(|| Arc::new(KeyFileProvider::new(cfg.transport.clone())));
        let svc = Arc::new(Service::new(
            registry,
            cfg.system_name,
            cfg.credential_config,
            keys,
            deps.attach_info,
        ));

        self.service
            .set(Arc::clone(&svc))
            .map_err(|_| anyhow::anyhow!("Service already initialized"))?;

        let api: Arc<dyn RpcModule> = Arc::new(SecurityModuleLocalClient::new(svc));
        Ok(api)
    }

    /// The service, once [`init`](Self::init) succeeded.
    #[must_use]
    pub fn service(&self) -> Option<&Arc<Service>> {
        self.service.get()
    }
}
