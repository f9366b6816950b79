//! Error types for the agent security module.

use thiserror::Error;

use crate::flavor::AuthFlavor;
use crate::models::CredentialStatus;

/// Transport-level rejection of an RPC call.
///
/// Conditions a client can act on (such as a bad certificate) are reported
/// inside a successful response instead.
#[derive(Debug, Error)]
pub enum SecurityRpcError {
    /// The request payload could not be decoded.
    #[error("failed to unmarshal request payload: {0}")]
    UnmarshalingPayload(String),

    /// The method does not belong to this module.
    #[error("unknown method {method} for module {module}")]
    UnknownMethod { module: i32, method: i32 },

    /// No credential request factory is registered for the flavor.
    #[error(
        "unsupported authentication method {0}: check that the authentication \
         required by the server is supported by the agent"
    )]
    UnsupportedFlavor(String),

    /// The server configuration does not allow the flavor.
    #[error("invalid authentication method {0}: not allowed by the server configuration")]
    FlavorNotAllowed(AuthFlavor),

    /// The set of server-approved flavors could not be retrieved.
    #[error("failed to retrieve valid authentication flavors: {0}")]
    AttachInfo(String),

    /// The credential request could not be initialized.
    #[error("credential request failed: {0}")]
    CredentialRequest(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure of a credential request lifecycle step.
///
/// `Clone` so that one failed creation can be reported to every caller
/// waiting on it.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// Rejected with a status the client should receive as-is.
    #[error("credential request rejected: {0}")]
    Status(CredentialStatus),

    /// The flavor-specific request body is malformed.
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),

    /// The peer identity could not be resolved.
    #[error("identity lookup failed: {0}")]
    IdentityLookup(String),

    /// The authority issuing the identity failed or refused.
    #[error("authority request failed: {0}")]
    Authority(String),

    /// A lifecycle step was called out of order.
    #[error("credential request is not initialized")]
    NotInitialized,

    /// The caller cancelled the request.
    #[error("credential request cancelled")]
    Cancelled,
}

/// Token verification and decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token flavor is not one the server accepts.
    #[error("token has authentication flavor {} not supported by server", AuthFlavor::name_of(*.0))]
    UnsupportedFlavor(i32),

    /// The verifier does not match the token.
    #[error("token verification failed: {0}")]
    VerificationFailed(&'static str),

    /// The token is not of the flavor being decoded.
    #[error("cannot decode {} token as {expected}", AuthFlavor::name_of(*.actual))]
    FlavorMismatch { expected: AuthFlavor, actual: i32 },

    /// The token payload is malformed.
    #[error("failed to decode {flavor} token payload: {reason}")]
    Decode { flavor: AuthFlavor, reason: String },
}

/// Failure to obtain the agent's signing key.
#[derive(Debug, Error)]
pub enum TransportKeyError {
    /// The certificate/key configuration is unusable.
    #[error("bad certificate configuration: {0}")]
    BadCert(String),

    /// Any other failure.
    #[error("signing key unavailable: {0}")]
    Unavailable(String),
}

/// Failure to retrieve attach info from the server.
#[derive(Debug, Error)]
pub enum AttachInfoError {
    #[error("attach info request failed: {0}")]
    Request(String),

    #[error("attach info request cancelled")]
    Cancelled,
}
