//! Per-identity cache of signed credentials.

use std::time::Duration;

use agent_security_sdk::{Credential, CredentialConfig, CredentialError, CredentialRequest};
use item_cache::{ExpirableItem, ItemCache};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::DomainError;

/// A signed credential together with its expiration deadline.
#[derive(Debug)]
pub struct CachedCredential {
    key: String,
    credential: Credential,
    expires_at: Instant,
}

impl CachedCredential {
    #[must_use]
    pub fn new(key: impl Into<String>, credential: Credential, lifetime: Duration) -> Self {
        Self {
            key: key.into(),
            credential,
            expires_at: Instant::now() + lifetime,
        }
    }

    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

impl ExpirableItem for CachedCredential {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Signed credentials keyed by [`CredentialRequest::key`].
///
/// Concurrent requests for one identity share a single signing call.
#[derive(Clone)]
pub struct CredentialCache {
    items: ItemCache<CachedCredential, CredentialError>,
    lifetime: Duration,
}

impl CredentialCache {
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            items: ItemCache::new(),
            lifetime,
        }
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Return the cached credential for `request`, signing a new one on miss
    /// or expiry. Signing a new one also drops other expired credentials.
    ///
    /// # Errors
    ///
    /// - `Acquisition` if signing failed, for this caller or the one it waited on
    /// - `Cancelled` if `cancel` fired first
    pub async fn get_signed_credential(
        &self,
        cancel: &CancellationToken,
        request: &dyn CredentialRequest,
    ) -> Result<Credential, DomainError> {
        let key = request.key();
        let lifetime = self.lifetime;

        let entry = self
            .items
            .get_or_create(cancel, key, || async move {
                debug!(key, "no valid cached credential, signing a new one");
                let credential = request.sign(cancel).await?;
                Ok::<_, CredentialError>(CachedCredential::new(key, credential, lifetime))
            })
            .await?;

        let credential = entry.credential().clone();
        entry.release();
        Ok(credential)
    }

    /// Drop expired credentials nobody holds. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.items.evict_expired()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// How a credential gets signed once its request is initialized.
#[derive(Clone)]
pub enum CredentialSigner {
    /// Every request signs a fresh credential.
    Direct,
    /// Requests with the same key share a cached credential.
    Cached(CredentialCache),
}

impl CredentialSigner {
    /// `Cached` when `cache_expiration` is non-zero, `Direct` otherwise.
    #[must_use]
    pub fn from_config(config: &CredentialConfig) -> Self {
        if config.cache_expiration.is_zero() {
            return Self::Direct;
        }
        info!(
            lifetime = %humantime::format_duration(config.cache_expiration),
            "credential cache enabled"
        );
        Self::Cached(CredentialCache::new(config.cache_expiration))
    }

    /// # Errors
    ///
    /// - `Acquisition` if the plugin failed to sign
    /// - `Cancelled` if `cancel` fired first
    pub async fn sign(
        &self,
        cancel: &CancellationToken,
        request: &dyn CredentialRequest,
    ) -> Result<Credential, DomainError> {
        match self {
            Self::Direct => tokio::select! {
                biased;
                () = cancel.cancelled() => Err(DomainError::Cancelled),
                result = request.sign(cancel) => result.map_err(|e| match e {
                    CredentialError::Cancelled => DomainError::Cancelled,
                    other => DomainError::Acquisition(other),
                }),
            },
            Self::Cached(cache) => cache.get_signed_credential(cancel, request).await,
        }
    }
}
