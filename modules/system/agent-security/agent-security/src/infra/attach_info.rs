use agent_security_sdk::{AttachInfoClient, AttachInfoError, AuthFlavor};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::registry::{FlavorParseError, parse_flavor_names};

/// Attach-info client answering from a fixed flavor list.
///
/// For deployments where the server's flavor list is known up front, and
/// for tests.
#[derive(Debug, Clone)]
pub struct StaticAttachInfo {
    flavors: Vec<i32>,
}

impl StaticAttachInfo {
    #[must_use]
    pub fn new(flavors: &[AuthFlavor]) -> Self {
        Self {
            flavors: flavors.iter().map(|f| i32::from(*f)).collect(),
        }
    }

    /// Build from raw identifiers, possibly including ones this agent does
    /// not know.
    #[must_use]
    pub fn from_raw(flavors: Vec<i32>) -> Self {
        Self { flavors }
    }

    /// Build from configuration names such as `"SYS"`.
    ///
    /// # Errors
    ///
    /// `Unrecognized` on the first unknown name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, FlavorParseError> {
        Ok(Self::new(&parse_flavor_names(names)?))
    }
}

#[async_trait]
impl AttachInfoClient for StaticAttachInfo {
    async fn valid_auth_flavors(
        &self,
        cancel: &CancellationToken,
        _system: &str,
    ) -> Result<Vec<i32>, AttachInfoError> {
        if cancel.is_cancelled() {
            return Err(AttachInfoError::Cancelled);
        }
        Ok(self.flavors.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_names_lists_parsed_flavors() {
        let client = StaticAttachInfo::from_names(&["AM", "SYS"]).unwrap();
        let cancel = CancellationToken::new();
        assert_eq!(client.valid_auth_flavors(&cancel, "x").await.unwrap(), vec![2, 1]);
    }

    #[test]
    fn from_names_rejects_unknown_name() {
        assert!(StaticAttachInfo::from_names(&["SYS", "GSS"]).is_err());
    }

    #[tokio::test]
    async fn cancelled_request_fails() {
        let client = StaticAttachInfo::new(&[AuthFlavor::AuthSys]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            client.valid_auth_flavors(&cancel, "x").await,
            Err(AttachInfoError::Cancelled)
        ));
    }
}
