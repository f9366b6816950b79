//! Configuration for the `AUTH_SYS` plugin.

use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SysAuthnPluginConfig {
    /// Machine name placed in credentials. Defaults to the host name.
    pub machine_name: Option<String>,

    /// Where uid/gid are resolved to names.
    pub identity_source: IdentitySource,

    /// User entries for the `static` source.
    pub users: Vec<UserMapping>,

    /// Group entries for the `static` source.
    pub groups: Vec<GroupMapping>,
}

/// Identity source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// The host's account database.
    #[default]
    Os,
    /// Entries from this configuration.
    Static,
}

/// Maps a uid to a user name and supplementary group names.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserMapping {
    pub uid: u32,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Maps a gid to a group name.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupMapping {
    pub gid: u32,
    pub name: String,
}
