//! Configuration for the `AUTH_AM` plugin.

use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AmAuthnPluginConfig {
    /// Largest ticket accepted from a client, in bytes.
    pub max_ticket_len: usize,

    /// Ticket-to-principal mappings for [`StaticAccessManager`](crate::StaticAccessManager).
    pub tickets: Vec<TicketMapping>,
}

impl Default for AmAuthnPluginConfig {
    fn default() -> Self {
        Self {
            max_ticket_len: 16 * 1024,
            tickets: Vec::new(),
        }
    }
}

/// Maps a ticket to the principal it authenticates.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketMapping {
    pub ticket: String,
    pub principal: String,
    #[serde(default)]
    pub groups: Vec<String>,
}
