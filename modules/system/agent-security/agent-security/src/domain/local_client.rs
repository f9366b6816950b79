//! Local (in-process) client for the agent security module.

use std::fmt;
use std::sync::Arc;

use agent_security_sdk::{
    METHOD_REQUEST_CREDENTIALS, METHOD_REQUEST_VALID_FLAVORS, MODULE_SECURITY_AGENT, RpcMethod,
    RpcModule, SecurityRpcError, Session,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{DomainError, Service};

/// Name the module reports to the host dispatcher.
pub const MODULE_NAME: &str = "agent_security";

/// Local client wrapping the service.
///
/// Handed to the host RPC dispatcher by the module during `init()`.
pub struct SecurityModuleLocalClient {
    svc: Arc<Service>,
}

impl SecurityModuleLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

impl fmt::Display for SecurityModuleLocalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MODULE_NAME)
    }
}

fn log_and_convert(op: &str, e: DomainError) -> SecurityRpcError {
    tracing::error!(operation = op, error = ?e, "agent_security call failed");
    e.into()
}

#[async_trait]
impl RpcModule for SecurityModuleLocalClient {
    fn id(&self) -> i32 {
        MODULE_SECURITY_AGENT
    }

    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    fn get_method(&self, id: i32) -> Result<RpcMethod, SecurityRpcError> {
        [METHOD_REQUEST_CREDENTIALS, METHOD_REQUEST_VALID_FLAVORS]
            .into_iter()
            .find(|method| method.id() == id)
            .ok_or(SecurityRpcError::UnknownMethod {
                module: MODULE_SECURITY_AGENT,
                method: id,
            })
    }

    async fn handle_call(
        &self,
        cancel: &CancellationToken,
        session: &Session,
        method: RpcMethod,
        request: &[u8],
    ) -> Result<Vec<u8>, SecurityRpcError> {
        self.svc
            .handle_call(cancel, session, method, request)
            .await
            .map_err(|e| log_and_convert(method.name(), e))
    }
}
