#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use agent_security::infra::StaticAttachInfo;
use agent_security::{AgentSecurity, AgentSecurityConfig, AgentSecurityDeps, TransportConfig};
use agent_security_sdk::token::{decode_sys_identity, verify_credential};
use agent_security_sdk::{
    AuthFlavor, CredentialStatus, GetCredResp, GetValidAuthResp, METHOD_REQUEST_CREDENTIALS,
    METHOD_REQUEST_VALID_FLAVORS, MODULE_SECURITY_AGENT, PeerCredentials, RpcModule,
    SecurityRpcError, Session, SigningKey,
};
use prost::Message;
use sys_authn_plugin::SysAuthnPlugin;
use sys_authn_plugin::config::{GroupMapping, IdentitySource, SysAuthnPluginConfig, UserMapping};
use tokio_util::sync::CancellationToken;

const SEED: [u8; 32] = [21u8; 32];

fn sys_plugin_config() -> SysAuthnPluginConfig {
    SysAuthnPluginConfig {
        machine_name: Some("storage-node-3".to_owned()),
        identity_source: IdentitySource::Static,
        users: vec![UserMapping {
            uid: 1000,
            name: "alice".to_owned(),
            groups: vec!["video".to_owned()],
        }],
        groups: vec![GroupMapping {
            gid: 1000,
            name: "alice".to_owned(),
        }],
    }
}

fn seed_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&SEED).unwrap();
    file
}

fn start(allowed: &[&str], key_file: &tempfile::NamedTempFile) -> Arc<dyn RpcModule> {
    let mut cfg = AgentSecurityConfig {
        transport: TransportConfig {
            allow_insecure: false,
            key_file: key_file.path().to_path_buf(),
        },
        ..AgentSecurityConfig::default()
    };
    cfg.credential_config.cache_expiration = Duration::from_secs(60);

    AgentSecurity::new()
        .init(
            cfg,
            AgentSecurityDeps {
                factories: vec![SysAuthnPlugin::factory(&sys_plugin_config()).unwrap()],
                attach_info: Arc::new(StaticAttachInfo::from_names(allowed).unwrap()),
                keys: None,
            },
        )
        .unwrap()
}

fn session(uid: u32) -> Session {
    Session::new(7, PeerCredentials { pid: 4242, uid, gid: uid })
}

#[tokio::test]
async fn issues_sys_credential_end_to_end() {
    let key_file = seed_file();
    let module = start(&["SYS"], &key_file);
    let cancel = CancellationToken::new();

    let method = module.get_method(101).unwrap();
    assert_eq!(method, METHOD_REQUEST_CREDENTIALS);

    let bytes = module
        .handle_call(&cancel, &session(1000), method, &[])
        .await
        .unwrap();
    let resp = GetCredResp::decode(bytes.as_slice()).unwrap();
    assert_eq!(resp.status, CredentialStatus::Success.code());

    let cred = resp.cred.unwrap();
    let public = SigningKey::from_bytes(&SEED).verifying_key();
    verify_credential(Some(&public), &cred, &[AuthFlavor::AuthSys]).unwrap();

    let sys = decode_sys_identity(cred.token.as_ref().unwrap()).unwrap();
    assert_eq!(sys.machinename, "storage-node-3");
    assert_eq!(sys.user, "alice@");
    assert_eq!(sys.groups, vec!["video@"]);
}

#[tokio::test]
async fn reports_server_flavors() {
    let key_file = seed_file();
    let module = start(&["SYS", "AM"], &key_file);

    let method = module.get_method(102).unwrap();
    assert_eq!(method, METHOD_REQUEST_VALID_FLAVORS);

    let bytes = module
        .handle_call(&CancellationToken::new(), &session(1000), method, &[])
        .await
        .unwrap();
    let resp = GetValidAuthResp::decode(bytes.as_slice()).unwrap();
    assert_eq!(resp.valid_auth_flavors, vec![1, 2]);
}

#[tokio::test]
async fn rejects_flavor_the_server_disallows() {
    let key_file = seed_file();
    let module = start(&["AM"], &key_file);

    let err = module
        .handle_call(
            &CancellationToken::new(),
            &session(1000),
            METHOD_REQUEST_CREDENTIALS,
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SecurityRpcError::FlavorNotAllowed(AuthFlavor::AuthSys)));
}

#[tokio::test]
async fn unknown_peer_gets_misc_status() {
    let key_file = seed_file();
    let module = start(&["SYS"], &key_file);

    let bytes = module
        .handle_call(
            &CancellationToken::new(),
            &session(31337),
            METHOD_REQUEST_CREDENTIALS,
            &[],
        )
        .await
        .unwrap();
    let resp = GetCredResp::decode(bytes.as_slice()).unwrap();
    assert_eq!(resp.status, CredentialStatus::Misc.code());
    assert!(resp.cred.is_none());
}

#[tokio::test]
async fn missing_key_file_is_bad_cert() {
    let key_file = seed_file();
    let module = start(&["SYS"], &key_file);
    std::fs::remove_file(key_file.path()).unwrap();

    let bytes = module
        .handle_call(
            &CancellationToken::new(),
            &session(1000),
            METHOD_REQUEST_CREDENTIALS,
            &[],
        )
        .await
        .unwrap();
    let resp = GetCredResp::decode(bytes.as_slice()).unwrap();
    assert_eq!(resp.status, CredentialStatus::BadCert.code());
}

#[test]
fn module_identity() {
    let key_file = seed_file();
    let module = start(&["SYS"], &key_file);

    assert_eq!(module.id(), MODULE_SECURITY_AGENT);
    assert_eq!(module.name(), "agent_security");
    assert!(matches!(
        module.get_method(103),
        Err(SecurityRpcError::UnknownMethod {
            module: MODULE_SECURITY_AGENT,
            method: 103
        })
    ));
}

#[test]
fn init_runs_once() {
    let module = AgentSecurity::new();
    let deps = || AgentSecurityDeps {
        factories: vec![SysAuthnPlugin::factory(&sys_plugin_config()).unwrap()],
        attach_info: Arc::new(StaticAttachInfo::new(&[AuthFlavor::AuthSys])),
        keys: None,
    };

    module.init(AgentSecurityConfig::default(), deps()).unwrap();
    assert!(module.service().is_some());
    assert!(module.init(AgentSecurityConfig::default(), deps()).is_err());
}

#[test]
fn init_rejects_empty_system_name() {
    let cfg = AgentSecurityConfig {
        system_name: String::new(),
        ..AgentSecurityConfig::default()
    };
    let result = AgentSecurity::new().init(
        cfg,
        AgentSecurityDeps {
            factories: Vec::new(),
            attach_info: Arc::new(StaticAttachInfo::new(&[])),
            keys: None,
        },
    );
    assert!(result.is_err());
}

#[test]
fn cache_follows_configured_expiration() {
    let key_file = seed_file();
    let module = AgentSecurity::new();
    let mut cfg = AgentSecurityConfig::default();
    cfg.transport.key_file = key_file.path().to_path_buf();
    cfg.credential_config.cache_expiration = Duration::from_secs(90);

    module
        .init(
            cfg,
            AgentSecurityDeps {
                factories: vec![SysAuthnPlugin::factory(&sys_plugin_config()).unwrap()],
                attach_info: Arc::new(StaticAttachInfo::new(&[AuthFlavor::AuthSys])),
                keys: None,
            },
        )
        .unwrap();

    match module.service().unwrap().signer() {
        agent_security::domain::CredentialSigner::Cached(cache) => {
            assert_eq!(cache.lifetime(), Duration::from_secs(90));
        }
        agent_security::domain::CredentialSigner::Direct => panic!("expected cached signer"),
    }
}
