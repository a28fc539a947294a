use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{Credential, CredentialError};

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    pub credentials: Vec<CredentialEntry>,
}

/// File locations for one credential. Relative paths resolve against the
/// directory of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub private_key_1024: Option<PathBuf>,
    #[serde(default)]
    pub private_key_2048: Option<PathBuf>,
    pub certificate: PathBuf,
    pub provisioning_data: PathBuf,
}

fn read(path: &Path) -> Result<Vec<u8>, CredentialError> {
    std::fs::read(path).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_key(path: &Path) -> Result<RsaPrivateKey, CredentialError> {
    let pem = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    RsaPrivateKey::from_pkcs1_pem(&pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(&pem))
        .map_err(|_| CredentialError::KeyFormat {
            path: path.to_path_buf(),
        })
}

impl CredentialEntry {
    /// Read every file the entry names and build the credential.
    pub fn load(
        &self,
        base_dir: &Path,
        default_label: &str,
    ) -> Result<Credential, CredentialError> {
        let resolve = |p: &Path| base_dir.join(p);
        let key_1024 = self
            .private_key_1024
            .as_deref()
            .map(|p| read_key(&resolve(p)))
            .transpose()?;
        let key_2048 = self
            .private_key_2048
            .as_deref()
            .map(|p| read_key(&resolve(p)))
            .transpose()?;
        let certificate = read(&resolve(&self.certificate))?;
        let provisioning_data = read(&resolve(&self.provisioning_data))?;

        let label = self.label.as_deref().unwrap_or(default_label);
        Credential::new(label, key_1024, key_2048, &certificate, provisioning_data)
    }
}

/// Load the credential set described by the JSON file at `path`.
///
/// An unreadable or malformed configuration fails. Entries whose files fail
/// to load are logged and skipped.
pub fn load_credentials(path: &Path) -> Result<Vec<Credential>, CredentialError> {
    let text = read(path)?;
    let config: CredentialConfig = serde_json::from_slice(&text)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut credentials = Vec::with_capacity(config.credentials.len());
    for (i, entry) in config.credentials.iter().enumerate() {
        let default_label = format!("credential-{i}");
        match entry.load(base_dir, &default_label) {
            Ok(cred) => {
                tracing::debug!(
                    label = cred.label(),
                    v1 = cred.key_1024().is_some(),
                    v2 = cred.key_2048().is_some(),
                    "Loaded credential"
                );
                credentials.push(cred);
            }
            Err(e) => {
                tracing::warn!(
                    entry = entry.label.as_deref().unwrap_or(&default_label),
                    error = %e,
                    "Skipping credential"
                );
            }
        }
    }
    Ok(credentials)
}
