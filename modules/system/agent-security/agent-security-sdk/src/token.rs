//! Token verifiers.
//!
//! A verifier proves a [`Token`] was not altered after the agent produced it.
//! It is computed over the token's protobuf encoding, which is deterministic
//! for these messages:
//!
//! - **unsigned**: SHA-512 digest of the encoded token, for deployments
//!   running without certificates
//! - **signed**: Ed25519 signature of the encoded token, checked with the
//!   agent's public key

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use prost::Message;
use sha2::{Digest, Sha512};

use crate::error::TokenError;
use crate::flavor::AuthFlavor;
use crate::models::{Credential, Sys, Token};

/// Length of an unsigned verifier.
pub const DIGEST_LEN: usize = 64;

/// Compute the verifier for `token`.
///
/// Returns a content digest when `signing_key` is `None`, otherwise a signature.
#[must_use]
pub fn compute_verifier(token: &Token, signing_key: Option<&SigningKey>) -> Vec<u8> {
    let encoded = token.encode_to_vec();
    match signing_key {
        None => Sha512::digest(&encoded).to_vec(),
        Some(key) => key.sign(&encoded).to_bytes().to_vec(),
    }
}

/// Verify `verifier` against `token`.
///
/// The flavor is checked first; a token of a flavor outside `valid_flavors`
/// is rejected without looking at the verifier.
///
/// # Errors
///
/// - `UnsupportedFlavor` if the token flavor is not in `valid_flavors`
/// - `VerificationFailed` if the digest or signature does not match
pub fn verify_token(
    public_key: Option<&VerifyingKey>,
    token: &Token,
    verifier: &[u8],
    valid_flavors: &[AuthFlavor],
) -> Result<(), TokenError> {
    if !valid_flavors
        .iter()
        .any(|flavor| i32::from(*flavor) == token.flavor)
    {
        return Err(TokenError::UnsupportedFlavor(token.flavor));
    }

    let encoded = token.encode_to_vec();
    match public_key {
        None => {
            if Sha512::digest(&encoded).as_slice() == verifier {
                Ok(())
            } else {
                Err(TokenError::VerificationFailed("unsigned hash mismatch"))
            }
        }
        Some(key) => {
            let signature = Signature::from_slice(verifier)
                .map_err(|_| TokenError::VerificationFailed("malformed signature"))?;
            key.verify(&encoded, &signature)
                .map_err(|_| TokenError::VerificationFailed("signature mismatch"))
        }
    }
}

/// Verify a credential's token against its embedded verifier.
///
/// # Errors
///
/// `VerificationFailed` if either part is missing, otherwise as [`verify_token`].
pub fn verify_credential(
    public_key: Option<&VerifyingKey>,
    credential: &Credential,
    valid_flavors: &[AuthFlavor],
) -> Result<(), TokenError> {
    let (Some(token), Some(verifier)) = (&credential.token, &credential.verifier) else {
        return Err(TokenError::VerificationFailed("credential is incomplete"));
    };
    verify_token(public_key, token, &verifier.data, valid_flavors)
}

/// Decode the identity carried by an `AUTH_SYS` token.
///
/// # Errors
///
/// - `FlavorMismatch` if the token is of another flavor
/// - `Decode` if the payload is malformed
pub fn decode_sys_identity(token: &Token) -> Result<Sys, TokenError> {
    if token.flavor != i32::from(AuthFlavor::AuthSys) {
        return Err(TokenError::FlavorMismatch {
            expected: AuthFlavor::AuthSys,
            actual: token.flavor,
        });
    }

    Sys::decode(token.data.as_slice()).map_err(|e| TokenError::Decode {
        flavor: AuthFlavor::AuthSys,
        reason: e.to_string(),
    })
}
