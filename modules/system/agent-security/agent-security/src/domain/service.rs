//! Domain service for the agent security module.

use std::sync::Arc;

use agent_security_sdk::{
    AttachInfoClient, AttachInfoError, AuthArgs, AuthFlavor, CredentialConfig,
    CredentialError, CredentialRequestFactory, CredentialStatus, GetCredResp, GetValidAuthResp,
    METHOD_REQUEST_CREDENTIALS, METHOD_REQUEST_VALID_FLAVORS, RpcMethod, Session,
    TransportKeyError, TransportKeyProvider,
};
use prost::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::credential_cache::CredentialSigner;
use super::error::DomainError;
use super::lifecycle::CredentialLifecycle;
use super::valid_flavors::ValidFlavorSet;
use crate::registry::FlavorRegistry;

/// Agent security service.
pub struct Service {
    registry: FlavorRegistry,
    credential_config: CredentialConfig,
    signer: CredentialSigner,
    keys: Arc<dyn TransportKeyProvider>,
    attach_info: Arc<dyn AttachInfoClient>,
    system: String,
    valid_flavors: ValidFlavorSet,
}

impl Service {
    #[must_use]
    pub fn new(
        registry: FlavorRegistry,
        system: String,
        credential_config: CredentialConfig,
        keys: Arc<dyn TransportKeyProvider>,
        attach_info: Arc<dyn AttachInfoClient>,
    ) -> Self {
        let signer = CredentialSigner::from_config(&credential_config);
        Self {
            registry,
            credential_config,
            signer,
            keys,
            attach_info,
            system,
            valid_flavors: ValidFlavorSet::new(),
        }
    }

    #[must_use]
    pub fn signer(&self) -> &CredentialSigner {
        &self.signer
    }

    /// Handle one call of either security method.
    ///
    /// An empty `request` selects the implicit flavor.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload` if `request` is not an `AuthArgs` message
    /// - `UnsupportedFlavor` if no factory serves the requested flavor
    /// - `UnknownMethod` for any method other than the two security methods
    /// - errors of the selected method
    #[tracing::instrument(skip_all, fields(method = %method, session = session.id()))]
    pub async fn handle_call(
        &self,
        cancel: &CancellationToken,
        session: &Session,
        method: RpcMethod,
        request: &[u8],
    ) -> Result<Vec<u8>, DomainError> {
        let args = decode_auth_args(request)?;

        let (flavor, factory) = AuthFlavor::try_from(args.flavor)
            .ok()
            .and_then(|flavor| self.registry.resolve(flavor).map(|f| (flavor, f)))
            .ok_or_else(|| {
                DomainError::UnsupportedFlavor(AuthFlavor::name_of(args.flavor).to_owned())
            })?;

        if method == METHOD_REQUEST_CREDENTIALS {
            self.get_credential(cancel, session, flavor, factory.as_ref(), &args.data)
                .await
        } else if method == METHOD_REQUEST_VALID_FLAVORS {
            self.get_valid_flavors(cancel).await
        } else {
            Err(DomainError::UnknownMethod {
                module: method.module(),
                method: method.id(),
            })
        }
    }

    async fn get_credential(
        &self,
        cancel: &CancellationToken,
        session: &Session,
        flavor: AuthFlavor,
        factory: &dyn CredentialRequestFactory,
        payload: &[u8],
    ) -> Result<Vec<u8>, DomainError> {
        let valid = self.ensure_valid_flavors(cancel).await?;
        if !valid.contains(&flavor) {
            return Err(DomainError::FlavorNotAllowed(flavor));
        }

        let signing_key = match self.keys.private_key() {
            Ok(key) => key,
            Err(TransportKeyError::BadCert(reason)) => {
                error!(%reason, "failed to get signing key");
                return Ok(status_response(CredentialStatus::BadCert));
            }
            Err(e @ TransportKeyError::Unavailable(_)) => {
                return Err(DomainError::SigningKey(e.to_string()));
            }
        };

        let mut lifecycle = CredentialLifecycle::new(factory.new_request());
        match lifecycle.init(&self.credential_config, session, payload, signing_key) {
            Ok(()) => {}
            Err(DomainError::Init(CredentialError::Status(status))) => {
                warn!(%flavor, %status, "credential request rejected");
                return Ok(status_response(status));
            }
            Err(e) => {
                error!(%flavor, error = %e, "unable to get credentials for client socket");
                return Err(e);
            }
        }

        match lifecycle.sign(&self.signer, cancel).await {
            Ok(credential) => {
                debug!(%flavor, key = lifecycle.key(), "issued credential");
                Ok(GetCredResp {
                    status: CredentialStatus::Success.code(),
                    cred: Some(credential),
                }
                .encode_to_vec())
            }
            Err(DomainError::Cancelled) => Err(DomainError::Cancelled),
            Err(e) => {
                error!(%flavor, error = %e, "failed to get user credential");
                Ok(status_response(CredentialStatus::Misc))
            }
        }
    }

    async fn get_valid_flavors(&self, cancel: &CancellationToken) -> Result<Vec<u8>, DomainError> {
        let valid = self.ensure_valid_flavors(cancel).await?;
        Ok(GetValidAuthResp {
            valid_auth_flavors: valid.iter().map(|f| i32::from(*f)).collect(),
        }
        .encode_to_vec())
    }

    async fn ensure_valid_flavors(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<[AuthFlavor]>, DomainError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DomainError::Cancelled),
            result = self.valid_flavors.get_or_populate(|| self.query_attach_info(cancel)) => result,
        }
    }

    #[tracing::instrument(skip_all, fields(system = %self.system))]
    async fn query_attach_info(&self, cancel: &CancellationToken) -> Result<Vec<i32>, DomainError> {
        self.attach_info
            .valid_auth_flavors(cancel, &self.system)
            .await
            .map_err(|e| match e {
                AttachInfoError::Cancelled => DomainError::Cancelled,
                AttachInfoError::Request(_) => DomainError::AttachInfo(e.to_string()),
            })
    }
}

fn decode_auth_args(request: &[u8]) -> Result<AuthArgs, DomainError> {
    if request.is_empty() {
        return Ok(AuthArgs {
            flavor: AuthFlavor::IMPLICIT.into(),
            data: Vec::new(),
        });
    }
    AuthArgs::decode(request).map_err(|e| DomainError::MalformedPayload(e.to_string()))
}

fn status_response(status: CredentialStatus) -> Vec<u8> {
    GetCredResp {
        status: status.code(),
        cred: None,
    }
    .encode_to_vec()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_selects_implicit_flavor() {
        let args = decode_auth_args(&[]).unwrap();
        assert_eq!(args.flavor, i32::from(AuthFlavor::AuthSys));
        assert!(args.data.is_empty());
    }

    #[test]
    fn explicit_payload_is_decoded() {
        let encoded = AuthArgs {
            flavor: AuthFlavor::AuthAm.into(),
            data: b"ticket".to_vec(),
        }
        .encode_to_vec();
        let args = decode_auth_args(&encoded).unwrap();
        assert_eq!(args.flavor, i32::from(AuthFlavor::AuthAm));
        assert_eq!(args.data, b"ticket");
    }

    #[test]
    fn garbage_payload_is_malformed() {
        assert!(matches!(
            decode_auth_args(&[0xff, 0xff, 0xff]),
            Err(DomainError::MalformedPayload(_))
        ));
    }

    #[test]
    fn status_response_carries_no_credential() {
        let resp = GetCredResp::decode(status_response(CredentialStatus::BadCert).as_slice()).unwrap();
        assert_eq!(resp.status, CredentialStatus::BadCert.code());
        assert!(resp.cred.is_none());
    }
}
