//! Signing key loaded from a seed file.

use std::fs;
use std::sync::Arc;

use agent_security_sdk::{SigningKey, TransportKeyError, TransportKeyProvider};
use parking_lot::Mutex;
use zeroize::Zeroizing;

use crate::config::TransportConfig;

const SEED_LEN: usize = 32;

/// Reads the agent's Ed25519 seed from [`TransportConfig::key_file`] on first
/// use and keeps the key afterwards. A failed read is retried on the next call.
pub struct KeyFileProvider {
    config: TransportConfig,
    loaded: Mutex<Option<Arc<SigningKey>>>,
}

impl KeyFileProvider {
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            loaded: Mutex::new(None),
        }
    }

    fn load(&self) -> Result<SigningKey, TransportKeyError> {
        let path = &self.config.key_file;
        check_permissions(path)?;

        let raw = Zeroizing::new(fs::read(path).map_err(|e| {
            TransportKeyError::BadCert(format!("reading {}: {e}", path.display()))
        })?);
        let seed: Zeroizing<[u8; SEED_LEN]> =
            Zeroizing::new(raw.as_slice().try_into().map_err(|_| {
                TransportKeyError::BadCert(format!(
                    "{} holds {} bytes, expected a {SEED_LEN}-byte Ed25519 seed",
                    path.display(),
                    raw.len()
                ))
            })?);
        Ok(SigningKey::from_bytes(&seed))
    }
}

impl TransportKeyProvider for KeyFileProvider {
    fn private_key(&self) -> Result<Option<Arc<SigningKey>>, TransportKeyError> {
        if self.config.allow_insecure {
            return Ok(None);
        }

        let mut loaded = self.loaded.lock();
        if let Some(key) = loaded.as_ref() {
            return Ok(Some(Arc::clone(key)));
        }
        let key = Arc::new(self.load()?);
        tracing::debug!(path = %self.config.key_file.display(), "loaded signing key");
        *loaded = Some(Arc::clone(&key));
        Ok(Some(key))
    }
}

#[cfg(unix)]
fn check_permissions(path: &std::path::Path) -> Result<(), TransportKeyError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)
        .map_err(|e| TransportKeyError::BadCert(format!("reading {}: {e}", path.display())))?
        .permissions()
        .mode();
    if mode & 0o077 != 0 {
        return Err(TransportKeyError::BadCert(format!(
            "{} is accessible by group or others (mode {:o})",
            path.display(),
            mode & 0o777
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &std::path::Path) -> Result<(), TransportKeyError> {
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    use super::*;

    fn key_file(contents: &[u8]) -> tempfile::NamedTempFile {
        // NamedTempFile is created with mode 0600 on unix.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    fn provider(file: &tempfile::NamedTempFile) -> KeyFileProvider {
        KeyFileProvider::new(TransportConfig {
            allow_insecure: false,
            key_file: file.path().to_path_buf(),
        })
    }

    #[test]
    fn insecure_mode_has_no_key() {
        let provider = KeyFileProvider::new(TransportConfig {
            allow_insecure: true,
            key_file: "/nonexistent".into(),
        });
        assert!(provider.private_key().unwrap().is_none());
    }

    #[test]
    fn loads_seed_once() {
        let file = key_file(&[9u8; SEED_LEN]);
        let provider = provider(&file);

        let first = provider.private_key().unwrap().unwrap();
        assert_eq!(first.to_bytes(), [9u8; SEED_LEN]);

        std::fs::remove_file(file.path()).unwrap();
        let second = provider.private_key().unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_file_is_bad_cert() {
        let provider = KeyFileProvider::new(TransportConfig {
            allow_insecure: false,
            key_file: "/nonexistent/agent.key".into(),
        });
        assert!(matches!(provider.private_key(), Err(TransportKeyError::BadCert(_))));
    }

    #[test]
    fn short_seed_is_bad_cert() {
        let file = key_file(&[1u8; 16]);
        match provider(&file).private_key() {
            Err(TransportKeyError::BadCert(msg)) => assert!(msg.contains("16 bytes")),
            other => panic!("expected BadCert, got: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn world_readable_key_is_bad_cert() {
        use std::os::unix::fs::PermissionsExt;

        let file = key_file(&[1u8; SEED_LEN]);
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(matches!(provider(&file).private_key(), Err(TransportKeyError::BadCert(_))));
    }
}
