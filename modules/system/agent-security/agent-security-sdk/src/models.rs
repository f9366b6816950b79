//! Wire messages and request-scoped models.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::flavor::AuthFlavor;

/// Request payload of a credential or flavor-list call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthArgs {
    #[prost(enumeration = "AuthFlavor", tag = "1")]
    pub flavor: i32,
    /// Flavor-specific request body, opaque to the dispatcher.
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

/// Authentication token, also used as the container for its verifier.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Token {
    #[prost(enumeration = "AuthFlavor", tag = "1")]
    pub flavor: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

/// Local OS identity carried by an `AUTH_SYS` token.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Sys {
    #[prost(uint64, tag = "1")]
    pub stamp: u64,
    #[prost(string, tag = "2")]
    pub machinename: String,
    #[prost(string, tag = "3")]
    pub user: String,
    #[prost(string, tag = "4")]
    pub group: String,
    #[prost(string, repeated, tag = "5")]
    pub groups: Vec<String>,
    #[prost(string, tag = "6")]
    pub secctx: String,
}

/// Signed credential handed back to the client.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Credential {
    #[prost(message, optional, tag = "1")]
    pub token: Option<Token>,
    #[prost(message, optional, tag = "2")]
    pub verifier: Option<Token>,
    /// Who produced the credential.
    #[prost(string, tag = "3")]
    pub origin: String,
}

/// Response of the credential request method.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetCredResp {
    #[prost(int32, tag = "1")]
    pub status: i32,
    #[prost(message, optional, tag = "2")]
    pub cred: Option<Credential>,
}

/// Response of the valid-flavor list method.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetValidAuthResp {
    #[prost(enumeration = "AuthFlavor", repeated, tag = "1")]
    pub valid_auth_flavors: Vec<i32>,
}

/// Status carried by a [`GetCredResp`].
///
/// Non-success statuses report conditions the client can diagnose, such as a
/// broken certificate setup on the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialStatus {
    Success,
    Misc,
    NoPermission,
    BadCert,
}

impl CredentialStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Misc => 1,
            Self::NoPermission => 2,
            Self::BadCert => 3,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Misc),
            2 => Some(Self::NoPermission),
            3 => Some(Self::BadCert),
            _ => None,
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::Misc => "miscellaneous error",
            Self::NoPermission => "no permission",
            Self::BadCert => "bad certificate",
        };
        f.write_str(text)
    }
}

/// Kernel-reported credentials of the peer process on a local socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerCredentials {
    pub pid: i32,
    pub uid: u32,
    pub gid: u32,
}

/// Trusted per-connection context supplied by the transport layer.
///
/// Everything here comes from the transport, never from the client payload,
/// so it is safe to derive cache keys from it.
#[derive(Debug, Clone)]
pub struct Session {
    id: u64,
    peer: PeerCredentials,
}

impl Session {
    #[must_use]
    pub fn new(id: u64, peer: PeerCredentials) -> Self {
        Self { id, peer }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn peer(&self) -> PeerCredentials {
        self.peer
    }
}

/// Credential settings shared by every credential request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialConfig {
    /// Lifetime of a cached credential. Zero disables the cache.
    #[serde(deserialize_with = "deserialize_duration")]
    pub cache_expiration: Duration,

    /// Identity substitutions keyed by client uid, or `"default"` for any uid
    /// without its own entry.
    pub client_user_map: HashMap<String, ClientUserMapEntry>,
}

impl CredentialConfig {
    /// Key of the catch-all entry in [`client_user_map`](Self::client_user_map).
    pub const DEFAULT_CLIENT_USER: &'static str = "default";

    /// Returns the substitution for `uid`, falling back to the default entry.
    #[must_use]
    pub fn client_user(&self, uid: u32) -> Option<&ClientUserMapEntry> {
        self.client_user_map
            .get(&uid.to_string())
            .or_else(|| self.client_user_map.get(Self::DEFAULT_CLIENT_USER))
    }
}

/// Replacement identity reported for a mapped client uid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientUserMapEntry {
    pub user: Option<String>,
    pub group: Option<String>,
    pub groups: Vec<String>,
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
