//! Configuration for the agent security module.

use std::path::{Path, PathBuf};

use agent_security_sdk::CredentialConfig;
use anyhow::{Context, bail};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;

/// Environment prefix for overrides, e.g. `AGENT_SECURITY_SYSTEM_NAME`.
pub const ENV_PREFIX: &str = "AGENT_SECURITY_";

/// Configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSecurityConfig {
    /// Name of the storage system whose attach info lists the valid flavors.
    pub system_name: String,

    /// Settings handed to every credential request.
    pub credential_config: CredentialConfig,

    /// Signing key configuration.
    pub transport: TransportConfig,
}

impl Default for AgentSecurityConfig {
    fn default() -> Self {
        Self {
            system_name: "daos_server".to_owned(),
            credential_config: CredentialConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

/// Where the agent's signing key comes from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Run without a signing key. Verifiers become unsigned digests.
    pub allow_insecure: bool,

    /// File holding the raw 32-byte Ed25519 seed.
    pub key_file: PathBuf,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            allow_insecure: false,
            key_file: PathBuf::from("/etc/daos/certs/agent.key"),
        }
    }
}

impl AgentSecurityConfig {
    /// Load from a YAML file, with `AGENT_SECURITY_*` environment overrides.
    ///
    /// Nested keys use `__`, e.g. `AGENT_SECURITY_TRANSPORT__ALLOW_INSECURE`.
    ///
    /// # Errors
    ///
    /// Fails if the file is unreadable or malformed, or if validation fails.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let cfg: Self = Figment::new()
            .merge(Yaml::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("loading agent security config from {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Fails if `system_name` is empty.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.system_name.trim().is_empty() {
            bail!("system_name must not be empty");
        }
        Ok(())
    }
}
