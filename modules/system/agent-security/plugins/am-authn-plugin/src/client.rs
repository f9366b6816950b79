//! Access-manager collaborator.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::AmAuthnPluginConfig;

/// Principal an access manager vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmPrincipal {
    pub principal: String,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Error)]
pub enum AccessManagerError {
    /// The access manager refused the ticket.
    #[error("ticket rejected: {0}")]
    Denied(String),

    #[error("access manager unavailable: {0}")]
    Unavailable(String),

    #[error("access manager request cancelled")]
    Cancelled,
}

/// Remote authority validating tickets.
#[async_trait]
pub trait AccessManagerClient: Send + Sync {
    /// Resolve the principal a ticket belongs to.
    ///
    /// # Errors
    ///
    /// `Denied` for an invalid ticket, `Unavailable` if the authority could
    /// not be reached, `Cancelled` if `cancel` fired.
    async fn resolve_principal(
        &self,
        cancel: &CancellationToken,
        ticket: &[u8],
    ) -> Result<AmPrincipal, AccessManagerError>;
}

/// Access manager answering from configured ticket mappings.
#[derive(Debug, Clone, Default)]
pub struct StaticAccessManager {
    tickets: HashMap<Vec<u8>, AmPrincipal>,
}

impl StaticAccessManager {
    #[must_use]
    pub fn from_config(cfg: &AmAuthnPluginConfig) -> Self {
        Self {
            tickets: cfg
                .tickets
                .iter()
                .map(|m| {
                    (
                        m.ticket.as_bytes().to_vec(),
                        AmPrincipal {
                            principal: m.principal.clone(),
                            groups: m.groups.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl AccessManagerClient for StaticAccessManager {
    async fn resolve_principal(
        &self,
        cancel: &CancellationToken,
        ticket: &[u8],
    ) -> Result<AmPrincipal, AccessManagerError> {
        if cancel.is_cancelled() {
            return Err(AccessManagerError::Cancelled);
        }
        self.tickets
            .get(ticket)
            .cloned()
            .ok_or_else(|| AccessManagerError::Denied("unknown ticket".to_owned()))
    }
}
