//! `AUTH_AM` credential request.

use std::sync::Arc;

use agent_security_sdk::token::compute_verifier;
use agent_security_sdk::{
    AuthFlavor, Credential, CredentialConfig, CredentialError, CredentialRequest,
    CredentialRequestFactory, CredentialStatus, Session, SigningKey, Token,
};
use async_trait::async_trait;
use prost::Message;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::client::{AccessManagerClient, AccessManagerError};
use crate::models::AmIdentity;

/// Origin recorded in every credential this plugin issues.
pub const ORIGIN: &str = "agent";

/// Creates [`AmCredentialRequest`]s that resolve tickets through one
/// access manager client.
pub struct AmCredentialFactory {
    client: Arc<dyn AccessManagerClient>,
    max_ticket_len: usize,
}

impl AmCredentialFactory {
    #[must_use]
    pub fn new(client: Arc<dyn AccessManagerClient>, max_ticket_len: usize) -> Self {
        Self {
            client,
            max_ticket_len,
        }
    }
}

impl CredentialRequestFactory for AmCredentialFactory {
    fn flavor(&self) -> AuthFlavor {
        AuthFlavor::AuthAm
    }

    fn new_request(&self) -> Box<dyn CredentialRequest> {
        Box::new(AmCredentialRequest {
            client: Arc::clone(&self.client),
            max_ticket_len: self.max_ticket_len,
            key: String::new(),
            state: None,
        })
    }
}

struct Initialized {
    uid: u32,
    gid: u32,
    ticket: Zeroizing<Vec<u8>>,
    signing_key: Option<Arc<SigningKey>>,
}

/// Credential for a principal vouched for by the access manager.
///
/// Keyed by `am:<uid>:<gid>:<sha256(ticket)>`. The uid/gid come from the
/// transport, so a client cannot reach another account's entry by replaying
/// its ticket.
pub struct AmCredentialRequest {
    client: Arc<dyn AccessManagerClient>,
    max_ticket_len: usize,
    key: String,
    state: Option<Initialized>,
}

#[async_trait]
impl CredentialRequest for AmCredentialRequest {
    fn init(
        &mut self,
        _config: &CredentialConfig,
        session: &Session,
        payload: &[u8],
        signing_key: Option<Arc<SigningKey>>,
    ) -> Result<(), CredentialError> {
        if payload.is_empty() {
            return Err(CredentialError::Status(CredentialStatus::NoPermission));
        }
        if payload.len() > self.max_ticket_len {
            return Err(CredentialError::InvalidPayload(format!(
                "ticket of {} bytes exceeds the {} byte limit",
                payload.len(),
                self.max_ticket_len
            )));
        }

        let peer = session.peer();
        self.key = format!(
            "am:{}:{}:{}",
            peer.uid,
            peer.gid,
            hex::encode(Sha256::digest(payload))
        );
        self.state = Some(Initialized {
            uid: peer.uid,
            gid: peer.gid,
            ticket: Zeroizing::new(payload.to_vec()),
            signing_key,
        });
        Ok(())
    }

    async fn sign(&self, cancel: &CancellationToken) -> Result<Credential, CredentialError> {
        let state = self.state.as_ref().ok_or(CredentialError::NotInitialized)?;

        let principal = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CredentialError::Cancelled),
            result = self.client.resolve_principal(cancel, &state.ticket) => {
                result.map_err(|e| match e {
                    AccessManagerError::Cancelled => CredentialError::Cancelled,
                    other => CredentialError::Authority(other.to_string()),
                })?
            }
        };
        tracing::debug!(uid = state.uid, principal = %principal.principal, "signing AUTH_AM credential");

        let identity = AmIdentity {
            principal: principal.principal,
            groups: principal.groups,
            uid: state.uid,
            gid: state.gid,
        };
        let token = Token {
            flavor: AuthFlavor::AuthAm.into(),
            data: identity.encode_to_vec(),
        };
        let verifier = Token {
            flavor: AuthFlavor::AuthAm.into(),
            data: compute_verifier(&token, state.signing_key.as_deref()),
        };

        Ok(Credential {
            token: Some(token),
            verifier: Some(verifier),
            origin: ORIGIN.to_owned(),
        })
    }

    fn key(&self) -> &str {
        &self.key
    }
}
