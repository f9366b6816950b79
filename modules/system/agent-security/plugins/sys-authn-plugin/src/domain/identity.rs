//! uid/gid to name resolution.

use std::collections::HashMap;

use agent_security_sdk::CredentialError;
use sysinfo::{Gid, Groups, Uid, Users};

use crate::config::SysAuthnPluginConfig;

/// Names of a local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user: String,
    pub group: String,
    /// Supplementary groups, excluding the primary one.
    pub groups: Vec<String>,
}

/// Resolves numeric ids to names.
///
/// Implementations may block; callers run them off the async executor.
pub trait IdentityResolver: Send + Sync {
    /// # Errors
    ///
    /// `IdentityLookup` if the uid or gid is unknown.
    fn resolve(&self, uid: u32, gid: u32) -> Result<UserIdentity, CredentialError>;
}

/// Reads the host's account database on every lookup.
#[derive(Debug, Default)]
pub struct OsIdentityResolver;

impl IdentityResolver for OsIdentityResolver {
    fn resolve(&self, uid: u32, gid: u32) -> Result<UserIdentity, CredentialError> {
        let users = Users::new_with_refreshed_list();
        let os_uid = Uid::try_from(uid as usize)
            .map_err(|_| CredentialError::IdentityLookup(format!("invalid uid {uid}")))?;
        let user = users
            .get_user_by_id(&os_uid)
            .ok_or_else(|| CredentialError::IdentityLookup(format!("unknown uid {uid}")))?;

        let groups = Groups::new_with_refreshed_list();
        let group = groups
            .list()
            .iter()
            .find(|g| gid_eq(g.id(), gid))
            .map(|g| g.name().to_owned())
            .ok_or_else(|| CredentialError::IdentityLookup(format!("unknown gid {gid}")))?;

        let supplementary = user
            .groups()
            .iter()
            .filter(|g| !gid_eq(g.id(), gid))
            .map(|g| g.name().to_owned())
            .collect();

        Ok(UserIdentity {
            user: user.name().to_owned(),
            group,
            groups: supplementary,
        })
    }
}

fn gid_eq(id: &Gid, gid: u32) -> bool {
    **id == gid
}

/// Resolves ids from configured entries.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    users: HashMap<u32, (String, Vec<String>)>,
    groups: HashMap<u32, String>,
}

impl StaticIdentityResolver {
    #[must_use]
    pub fn from_config(cfg: &SysAuthnPluginConfig) -> Self {
        Self {
            users: cfg
                .users
                .iter()
                .map(|u| (u.uid, (u.name.clone(), u.groups.clone())))
                .collect(),
            groups: cfg.groups.iter().map(|g| (g.gid, g.name.clone())).collect(),
        }
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn resolve(&self, uid: u32, gid: u32) -> Result<UserIdentity, CredentialError> {
        let (user, groups) = self
            .users
            .get(&uid)
            .ok_or_else(|| CredentialError::IdentityLookup(format!("unknown uid {uid}")))?;
        let group = self
            .groups
            .get(&gid)
            .ok_or_else(|| CredentialError::IdentityLookup(format!("unknown gid {gid}")))?;

        Ok(UserIdentity {
            user: user.clone(),
            group: group.clone(),
            groups: groups.iter().filter(|g| *g != group).cloned().collect(),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{GroupMapping, IdentitySource, UserMapping};

    fn config() -> SysAuthnPluginConfig {
        SysAuthnPluginConfig {
            identity_source: IdentitySource::Static,
            users: vec![UserMapping {
                uid: 1000,
                name: "alice".to_owned(),
                groups: vec!["staff".to_owned(), "video".to_owned()],
            }],
            groups: vec![GroupMapping {
                gid: 100,
                name: "staff".to_owned(),
            }],
            ..SysAuthnPluginConfig::default()
        }
    }

    #[test]
    fn static_resolver_excludes_primary_from_supplementary() {
        let identity = StaticIdentityResolver::from_config(&config())
            .resolve(1000, 100)
            .unwrap();
        assert_eq!(
            identity,
            UserIdentity {
                user: "alice".to_owned(),
                group: "staff".to_owned(),
                groups: vec!["video".to_owned()],
            }
        );
    }

    #[test]
    fn static_resolver_rejects_unknown_ids() {
        let resolver = StaticIdentityResolver::from_config(&config());
        assert!(matches!(
            resolver.resolve(1001, 100),
            Err(CredentialError::IdentityLookup(msg)) if msg == "unknown uid 1001"
        ));
        assert!(matches!(
            resolver.resolve(1000, 7),
            Err(CredentialError::IdentityLookup(msg)) if msg == "unknown gid 7"
        ));
    }
}
