// src/core/crypto/key_manager.rs
use std::env;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rand::{rngs::OsRng, RngCore};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::utils::{
    config::CryptoConfig,
    error::{Result, FaceError},
};

/// Environment variable holding the template encryption key.
pub const KEY_ENV: &str = "FACE_ENCRYPTION_KEY";

const GENERATED_KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    File(PathBuf),
    Generated(PathBuf),
}

pub struct KeyMaterial {
    secret: Vec<u8>,
    source: KeySource,
}

impl KeyMaterial {
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("secret", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves the key once at startup: environment, then key file, then a
/// freshly generated key written to the key file.
pub struct KeyManager {
    key_file: PathBuf,
}

impl KeyManager {
    pub fn new(config: &CryptoConfig) -> Self {
        Self {
            key_file: config.key_file.clone(),
        }
    }

    pub fn load(&self) -> Result<KeyMaterial> {
        self.resolve(env::var(KEY_ENV).ok())
    }

    /// Same policy as [`KeyManager::load`] with the environment value passed in.
    pub fn resolve(&self, env_value: Option<String>) -> Result<KeyMaterial> {
        if let Some(value) = env_value {
            let value = value.trim();
            if !value.is_empty() {
                info!("Using encryption key from {}", KEY_ENV);
                return Ok(KeyMaterial {
                    secret: value.as_bytes().to_vec(),
                    source: KeySource::Environment,
                });
            }
            warn!("{} is set but empty, ignoring it", KEY_ENV);
        }

        if let Some(secret) = read_key_file(&self.key_file)? {
            info!("Using encryption key from {:?}", self.key_file);
            return Ok(KeyMaterial {
                secret,
                source: KeySource::File(self.key_file.clone()),
            });
        }

        self.generate()
    }

    fn generate(&self) -> Result<KeyMaterial> {
        let mut raw = [0u8; GENERATED_KEY_LEN];
        OsRng.fill_bytes(&mut raw);
        let encoded = hex::encode(raw);

        let parent = match self.key_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|e| FaceError::Crypto(format!("Failed to create key directory: {}", e)))?;

        let mut tmp = NamedTempFile::new_in(&parent)
            .map_err(|e| FaceError::Crypto(format!("Failed to create key file: {}", e)))?;
        tmp.write_all(encoded.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| FaceError::Crypto(format!("Failed to write key file: {}", e)))?;
        restrict_permissions(tmp.as_file())?;

        // Link into place only if nobody else did; a concurrent first start
        // must end up sharing one key.
        match tmp.persist_noclobber(&self.key_file) {
            Ok(_) => {
                warn!("==================================================================");
                warn!("{} is not set and no key file was found.", KEY_ENV);
                warn!("Generated a new encryption key at {:?}.", self.key_file);
                warn!("Back this file up or export its contents as {}.", KEY_ENV);
                warn!("Losing it makes every enrolled face undecryptable.");
                warn!("==================================================================");

                Ok(KeyMaterial {
                    secret: encoded.into_bytes(),
                    source: KeySource::Generated(self.key_file.clone()),
                })
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                info!("Key file {:?} appeared concurrently, using it", self.key_file);
                let secret = read_key_file(&self.key_file)?.ok_or_else(|| {
                    FaceError::Crypto(format!("Key file {:?} vanished", self.key_file))
                })?;
                Ok(KeyMaterial {
                    secret,
                    source: KeySource::File(self.key_file.clone()),
                })
            }
            Err(e) => Err(FaceError::Crypto(format!(
                "Failed to persist key file {:?}: {}",
                self.key_file, e.error
            ))),
        }
    }
}

fn read_key_file(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                return Err(FaceError::Crypto(format!("Key file {:?} is empty", path)));
            }
            Ok(Some(trimmed.as_bytes().to_vec()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FaceError::Crypto(format!("Failed to read key file {:?}: {}", path, e))),
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(|e| FaceError::Crypto(format!("Failed to restrict key file permissions: {}", e)))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn manager(path: PathBuf) -> KeyManager {
        KeyManager::new(&CryptoConfig { key_file: path })
    }

    #[test]
    fn test_environment_wins_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.key");
        fs::write(&path, "from-file").unwrap();

        let material = manager(path).resolve(Some("from-env".into())).unwrap();
        assert_eq!(material.secret(), b"from-env");
        assert_eq!(material.source(), &KeySource::Environment);
    }

    #[test]
    fn test_file_used_when_environment_missing_or_blank() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.key");
        fs::write(&path, "from-file\n").unwrap();

        let material = manager(path.clone()).resolve(Some("   ".into())).unwrap();
        assert_eq!(material.secret(), b"from-file");
        assert_eq!(material.source(), &KeySource::File(path));
    }

    #[test]
    fn test_generates_and_persists_when_nothing_configured() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys").join("secret.key");
        let keys = manager(path.clone());

        let first = keys.resolve(None).unwrap();
        assert_eq!(first.source(), &KeySource::Generated(path.clone()));
        assert_eq!(first.secret().len(), GENERATED_KEY_LEN * 2);

        // Second start reads the same key back.
        let second = keys.resolve(None).unwrap();
        assert_eq!(second.source(), &KeySource::File(path.clone()));
        assert_eq!(first.secret(), second.secret());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_concurrent_first_start_converges_on_one_key() {
        let dir = tempdir().unwrap();
        let path = Arc::new(dir.path().join("secret.key"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    manager(path.as_ref().clone()).resolve(None).unwrap().secret().to_vec()
                })
            })
            .collect();

        let secrets: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let on_disk = fs::read_to_string(path.as_ref()).unwrap();
        for secret in secrets {
            assert_eq!(secret, on_disk.as_bytes());
        }
    }

    #[test]
    fn test_empty_key_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.key");
        fs::write(&path, "\n").unwrap();

        assert!(matches!(manager(path).resolve(None), Err(FaceError::Crypto(_))));
    }

    #[test]
    fn test_debug_output_redacts_secret() {
        let material = KeyMaterial {
            secret: b"super-secret".to_vec(),
            source: KeySource::Environment,
        };
        let rendered = format!("{:?}", material);
        assert!(!rendered.contains("super-secret"));
    }
}
