use rsa::RsaPrivateKey;
use rsa::traits::PublicKeyParts;
use sha1::{Digest, Sha1};

use super::CredentialError;
use crate::spc::SpcVersion;

pub const CERT_HASH_LEN: usize = 20;

/// One server identity: private keys, certificate fingerprints and the
/// provisioning data handed to the key-derivation authority.
#[derive(Clone)]
pub struct Credential {
    label: String,
    key_1024: Option<RsaPrivateKey>,
    key_2048: Option<RsaPrivateKey>,
    cert_hash_1024: Option<[u8; CERT_HASH_LEN]>,
    cert_hash_2048: Option<[u8; CERT_HASH_LEN]>,
    /// Hash over the whole two-certificate bundle; some older v1 clients send this.
    cert_hash_full: Option<[u8; CERT_HASH_LEN]>,
    provisioning_data: Vec<u8>,
}

fn sha1(bytes: &[u8]) -> [u8; CERT_HASH_LEN] {
    Sha1::digest(bytes).into()
}

fn check_size(key: &RsaPrivateKey, bits: usize) -> Result<(), CredentialError> {
    let actual = key.size() * 8;
    if actual != bits {
        return Err(CredentialError::KeySize {
            expected: bits,
            actual,
        });
    }
    Ok(())
}

/// Length of the first certificate when `bundle` holds two DER certificates
/// back to back.
fn first_certificate_len(bundle: &[u8]) -> Option<usize> {
    if bundle.len() < 4 || bundle[..2] != [0x30, 0x82] {
        return None;
    }
    let len = 4 + u16::from_be_bytes([bundle[2], bundle[3]]) as usize;
    (len < bundle.len()).then_some(len)
}

impl Credential {
    pub fn new(
        label: impl Into<String>,
        key_1024: Option<RsaPrivateKey>,
        key_2048: Option<RsaPrivateKey>,
        certificate: &[u8],
        provisioning_data: Vec<u8>,
    ) -> Result<Self, CredentialError> {
        if let Some(k) = &key_1024 {
            check_size(k, 1024)?;
        }
        if let Some(k) = &key_2048 {
            check_size(k, 2048)?;
        }

        let (cert_hash_1024, cert_hash_2048, cert_hash_full) =
            match (first_certificate_len(certificate), &key_1024, &key_2048) {
                (_, None, None) => return Err(CredentialError::NoPrivateKey),
                (Some(split), _, _) => (
                    Some(sha1(&certificate[..split])),
                    Some(sha1(&certificate[split..])),
                    Some(sha1(certificate)),
                ),
                (None, Some(_), None) => (Some(sha1(certificate)), None, None),
                (None, None, Some(_)) => (None, Some(sha1(certificate)), None),
                (None, Some(_), Some(_)) => return Err(CredentialError::SingleCertificateBundle),
            };

        Ok(Self {
            label: label.into(),
            key_1024,
            key_2048,
            cert_hash_1024,
            cert_hash_2048,
            cert_hash_full,
            provisioning_data,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn key_1024(&self) -> Option<&RsaPrivateKey> {
        self.key_1024.as_ref()
    }

    pub fn key_2048(&self) -> Option<&RsaPrivateKey> {
        self.key_2048.as_ref()
    }

    /// The private key that unwraps envelopes of `version`.
    pub fn key_for(&self, version: SpcVersion) -> Option<&RsaPrivateKey> {
        match version {
            SpcVersion::V1 => self.key_1024(),
            SpcVersion::V2 => self.key_2048(),
        }
    }

    pub fn cert_hash_1024(&self) -> Option<&[u8; CERT_HASH_LEN]> {
        self.cert_hash_1024.as_ref()
    }

    pub fn cert_hash_2048(&self) -> Option<&[u8; CERT_HASH_LEN]> {
        self.cert_hash_2048.as_ref()
    }

    pub fn cert_hash_full(&self) -> Option<&[u8; CERT_HASH_LEN]> {
        self.cert_hash_full.as_ref()
    }

    pub fn provisioning_data(&self) -> &[u8] {
        &self.provisioning_data
    }

    /// v1 envelopes match the 1024-bit or full-bundle hash, v2 only the 2048-bit hash.
    pub fn matches(&self, version: SpcVersion, cert_hash: &[u8; CERT_HASH_LEN]) -> bool {
        let hit = |h: Option<&[u8; CERT_HASH_LEN]>| h == Some(cert_hash);
        match version {
            SpcVersion::V1 => hit(self.cert_hash_1024()) || hit(self.cert_hash_full()),
            SpcVersion::V2 => hit(self.cert_hash_2048()),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("label", &self.label)
            .field("key_1024", &self.key_1024.is_some())
            .field("key_2048", &self.key_2048.is_some())
            .field("cert_hash_1024", &self.cert_hash_1024)
            .field("cert_hash_2048", &self.cert_hash_2048)
            .field("cert_hash_full", &self.cert_hash_full)
            .field("provisioning_data_len", &self.provisioning_data.len())
            .finish()
    }
}
