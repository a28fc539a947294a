pub mod credential;
pub mod loader;

pub use credential::{CERT_HASH_LEN, Credential};
pub use loader::{CredentialConfig, CredentialEntry, load_credentials};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{path}: not a PEM RSA private key (PKCS#1 or PKCS#8)")]
    KeyFormat { path: PathBuf },
    #[error("expected a {expected}-bit key, got {actual} bits")]
    KeySize { expected: usize, actual: usize },
    #[error("two private keys provided, but the certificate bundle has only one certificate")]
    SingleCertificateBundle,
    #[error("no private key configured")]
    NoPrivateKey,
}
