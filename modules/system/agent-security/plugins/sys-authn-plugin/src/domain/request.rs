//! `AUTH_SYS` credential request.

use std::sync::Arc;

use agent_security_sdk::token::compute_verifier;
use agent_security_sdk::{
    AuthFlavor, ClientUserMapEntry, Credential, CredentialConfig, CredentialError,
    CredentialRequest, CredentialRequestFactory, Session, SigningKey, Sys, Token,
};
use async_trait::async_trait;
use prost::Message;
use tokio_util::sync::CancellationToken;

use super::identity::{IdentityResolver, UserIdentity};

/// Origin recorded in every credential this plugin issues.
pub const ORIGIN: &str = "agent";

/// Creates [`SysCredentialRequest`]s sharing one resolver and machine name.
pub struct SysCredentialFactory {
    resolver: Arc<dyn IdentityResolver>,
    machine_name: Arc<str>,
}

impl SysCredentialFactory {
    #[must_use]
    pub fn new(resolver: Arc<dyn IdentityResolver>, machine_name: impl Into<Arc<str>>) -> Self {
        Self {
            resolver,
            machine_name: machine_name.into(),
        }
    }
}

impl CredentialRequestFactory for SysCredentialFactory {
    fn flavor(&self) -> AuthFlavor {
        AuthFlavor::AuthSys
    }

    fn new_request(&self) -> Box<dyn CredentialRequest> {
        Box::new(SysCredentialRequest {
            resolver: Arc::clone(&self.resolver),
            machine_name: Arc::clone(&self.machine_name),
            key: String::new(),
            state: None,
        })
    }
}

struct Initialized {
    uid: u32,
    gid: u32,
    mapped: Option<ClientUserMapEntry>,
    signing_key: Option<Arc<SigningKey>>,
}

/// Credential for the peer's local OS identity.
///
/// Keyed by `sys:<uid>:<gid>` of the peer, so every process of one user
/// and primary group shares a cached credential.
pub struct SysCredentialRequest {
    resolver: Arc<dyn IdentityResolver>,
    machine_name: Arc<str>,
    key: String,
    state: Option<Initialized>,
}

impl SysCredentialRequest {
    async fn lookup(
        &self,
        cancel: &CancellationToken,
        uid: u32,
        gid: u32,
    ) -> Result<UserIdentity, CredentialError> {
        let resolver = Arc::clone(&self.resolver);
        let lookup = tokio::task::spawn_blocking(move || resolver.resolve(uid, gid));
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CredentialError::Cancelled),
            joined = lookup => joined.map_err(|e| {
                CredentialError::IdentityLookup(format!("lookup task failed: {e}"))
            })?,
        }
    }
}

#[async_trait]
impl CredentialRequest for SysCredentialRequest {
    fn init(
        &mut self,
        config: &CredentialConfig,
        session: &Session,
        _payload: &[u8],
        signing_key: Option<Arc<SigningKey>>,
    ) -> Result<(), CredentialError> {
        let peer = session.peer();
        self.key = format!("sys:{}:{}", peer.uid, peer.gid);
        self.state = Some(Initialized {
            uid: peer.uid,
            gid: peer.gid,
            mapped: config.client_user(peer.uid).cloned(),
            signing_key,
        });
        Ok(())
    }

    async fn sign(&self, cancel: &CancellationToken) -> Result<Credential, CredentialError> {
        let state = self.state.as_ref().ok_or(CredentialError::NotInitialized)?;
        if cancel.is_cancelled() {
            return Err(CredentialError::Cancelled);
        }

        let identity = match state.mapped.as_ref() {
            Some(ClientUserMapEntry {
                user: Some(user),
                group: Some(group),
                groups,
            }) => UserIdentity {
                user: user.clone(),
                group: group.clone(),
                groups: groups.clone(),
            },
            mapped => {
                let resolved = self.lookup(cancel, state.uid, state.gid).await?;
                apply_client_user_map(resolved, mapped)
            }
        };

        tracing::debug!(
            key = %self.key,
            user = %identity.user,
            "signing AUTH_SYS credential"
        );
        Ok(build_credential(
            &self.machine_name,
            &identity,
            state.signing_key.as_deref(),
        ))
    }

    fn key(&self) -> &str {
        &self.key
    }
}

fn apply_client_user_map(
    mut identity: UserIdentity,
    entry: Option<&ClientUserMapEntry>,
) -> UserIdentity {
    let Some(entry) = entry else {
        return identity;
    };
    if let Some(user) = &entry.user {
        identity.user.clone_from(user);
    }
    if let Some(group) = &entry.group {
        identity.group.clone_from(group);
    }
    if !entry.groups.is_empty() {
        identity.groups.clone_from(&entry.groups);
    }
    identity
}

fn principal(name: &str) -> String {
    format!("{name}@")
}

fn build_credential(
    machine_name: &str,
    identity: &UserIdentity,
    signing_key: Option<&SigningKey>,
) -> Credential {
    let sys = Sys {
        stamp: 0,
        machinename: machine_name.to_owned(),
        user: principal(&identity.user),
        group: principal(&identity.group),
        groups: identity.groups.iter().map(|g| principal(g)).collect(),
        secctx: String::new(),
    };
    let token = Token {
        flavor: AuthFlavor::AuthSys.into(),
        data: sys.encode_to_vec(),
    };
    let verifier = Token {
        flavor: AuthFlavor::AuthSys.into(),
        data: compute_verifier(&token, signing_key),
    };

    Credential {
        token: Some(token),
        verifier: Some(verifier),
        origin: ORIGIN.to_owned(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashMap;

    use agent_security_sdk::PeerCredentials;
    use agent_security_sdk::token::{decode_sys_identity, verify_credential};

    use super::*;
    use crate::domain::identity::StaticIdentityResolver;
    use crate::config::{GroupMapping, IdentitySource, SysAuthnPluginConfig, UserMapping};

    fn factory() -> SysCredentialFactory {
        let cfg = SysAuthnPluginConfig {
            identity_source: IdentitySource::Static,
            users: vec![UserMapping {
                uid: 1000,
                name: "alice".to_owned(),
                groups: vec!["video".to_owned()],
            }],
            groups: vec![GroupMapping {
                gid: 100,
                name: "staff".to_owned(),
            }],
            ..SysAuthnPluginConfig::default()
        };
        SysCredentialFactory::new(
            Arc::new(StaticIdentityResolver::from_config(&cfg)),
            "node-7",
        )
    }

    fn session(uid: u32, gid: u32) -> Session {
        Session::new(1, PeerCredentials { pid: 42, uid, gid })
    }

    #[tokio::test]
    async fn signs_peer_identity() {
        let key = SigningKey::from_bytes(&[5u8; 32]);
        let mut request = factory().new_request();
        request
            .init(
                &CredentialConfig::default(),
                &session(1000, 100),
                &[],
                Some(Arc::new(key.clone())),
            )
            .unwrap();
        assert_eq!(request.key(), "sys:1000:100");

        let cred = request.sign(&CancellationToken::new()).await.unwrap();
        assert_eq!(cred.origin, ORIGIN);
        verify_credential(Some(&key.verifying_key()), &cred, &[AuthFlavor::AuthSys]).unwrap();

        let sys = decode_sys_identity(cred.token.as_ref().unwrap()).unwrap();
        assert_eq!(sys.machinename, "node-7");
        assert_eq!(sys.user, "alice@");
        assert_eq!(sys.group, "staff@");
        assert_eq!(sys.groups, vec!["video@"]);
    }

    #[tokio::test]
    async fn client_user_map_substitutes_names() {
        let config = CredentialConfig {
            client_user_map: HashMap::from([(
                "1000".to_owned(),
                ClientUserMapEntry {
                    user: Some("svc-backup".to_owned()),
                    group: None,
                    groups: vec!["backup".to_owned()],
                },
            )]),
            ..CredentialConfig::default()
        };
        let mut request = factory().new_request();
        request.init(&config, &session(1000, 100), &[], None).unwrap();
        assert_eq!(request.key(), "sys:1000:100");

        let cred = request.sign(&CancellationToken::new()).await.unwrap();
        let sys = decode_sys_identity(cred.token.as_ref().unwrap()).unwrap();
        assert_eq!(sys.user, "svc-backup@");
        assert_eq!(sys.group, "staff@");
        assert_eq!(sys.groups, vec!["backup@"]);
    }

    #[tokio::test]
    async fn fully_mapped_identity_needs_no_lookup() {
        let config = CredentialConfig {
            client_user_map: HashMap::from([(
                CredentialConfig::DEFAULT_CLIENT_USER.to_owned(),
                ClientUserMapEntry {
                    user: Some("nobody".to_owned()),
                    group: Some("nogroup".to_owned()),
                    groups: Vec::new(),
                },
            )]),
            ..CredentialConfig::default()
        };
        let mut request = factory().new_request();
        request.init(&config, &session(4242, 4242), &[], None).unwrap();

        let cred = request.sign(&CancellationToken::new()).await.unwrap();
        let sys = decode_sys_identity(cred.token.as_ref().unwrap()).unwrap();
        assert_eq!(sys.user, "nobody@");
        assert_eq!(sys.group, "nogroup@");
        assert!(sys.groups.is_empty());
    }

    #[tokio::test]
    async fn unknown_peer_fails_signing() {
        let mut request = factory().new_request();
        request
            .init(&CredentialConfig::default(), &session(1, 1), &[], None)
            .unwrap();
        assert!(matches!(
            request.sign(&CancellationToken::new()).await,
            Err(CredentialError::IdentityLookup(_))
        ));
    }

    #[tokio::test]
    async fn sign_requires_init() {
        let request = factory().new_request();
        assert!(matches!(
            request.sign(&CancellationToken::new()).await,
            Err(CredentialError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn cancelled_sign_fails() {
        let mut request = factory().new_request();
        request
            .init(&CredentialConfig::default(), &session(1000, 100), &[], None)
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(request.sign(&cancel).await, Err(CredentialError::Cancelled)));
    }
}
