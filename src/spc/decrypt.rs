use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use rsa::Oaep;
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::envelope::{SpcEnvelope, SpcVersion};
use super::SpcError;
use crate::credentials::Credential;
use crate::tllv::{RecordSet, parse_container};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub const PAYLOAD_KEY_LEN: usize = 16;
const AES_BLOCK: usize = 16;

/// A decrypted SPC: the envelope, the credential that opened it and the
/// records of its payload.
#[derive(Debug)]
pub struct OpenedSpc<'c> {
    pub envelope: SpcEnvelope,
    pub credential: &'c Credential,
    pub records: RecordSet,
}

/// First credential whose fingerprint matches the envelope.
pub fn select_credential<'c>(
    credentials: &'c [Credential],
    envelope: &SpcEnvelope,
) -> Result<&'c Credential, SpcError> {
    credentials
        .iter()
        .find(|c| c.matches(envelope.version, &envelope.cert_hash))
        .ok_or_else(|| SpcError::NoMatchingCredential(hex::encode(envelope.cert_hash)))
}

/// Recover the payload key with RSA-OAEP: SHA-1 for v1, SHA-256 for v2.
pub fn unwrap_key(
    envelope: &SpcEnvelope,
    credential: &Credential,
) -> Result<Zeroizing<[u8; PAYLOAD_KEY_LEN]>, SpcError> {
    let version = envelope.version;
    let key = credential
        .key_for(version)
        .ok_or_else(|| SpcError::MissingKey {
            label: credential.label().to_string(),
            bits: version.rsa_bits(),
        })?;

    let mut rng = rand::thread_rng();
    let plain = match version {
        SpcVersion::V1 => {
            key.decrypt_blinded(&mut rng, Oaep::new::<Sha1>(), &envelope.encrypted_key)
        }
        SpcVersion::V2 => {
            key.decrypt_blinded(&mut rng, Oaep::new::<Sha256>(), &envelope.encrypted_key)
        }
    }
    .map(Zeroizing::new)
    .map_err(SpcError::KeyUnwrap)?;

    if plain.len() != PAYLOAD_KEY_LEN {
        return Err(SpcError::KeyLength(plain.len()));
    }
    let mut out = Zeroizing::new([0u8; PAYLOAD_KEY_LEN]);
    out.copy_from_slice(&plain);
    Ok(out)
}

/// AES-128-CBC without padding removal; the plaintext is exactly as long as
/// the ciphertext.
pub fn decrypt_payload(
    envelope: &SpcEnvelope,
    key: &[u8; PAYLOAD_KEY_LEN],
) -> Result<Vec<u8>, SpcError> {
    if envelope.payload.len() % AES_BLOCK != 0 {
        return Err(SpcError::PayloadNotBlockAligned(envelope.payload.len()));
    }
    let cipher = Aes128CbcDec::new_from_slices(key, &envelope.iv)
        .map_err(|_| SpcError::PayloadDecrypt)?;
    cipher
        .decrypt_padded_vec_mut::<NoPadding>(&envelope.payload)
        .map_err(|_| SpcError::PayloadDecrypt)
}

impl SpcEnvelope {
    /// Select a credential, unwrap the payload key, decrypt and parse the payload.
    pub fn open<'c>(&self, credentials: &'c [Credential]) -> Result<OpenedSpc<'c>, SpcError> {
        let credential = select_credential(credentials, self)?;
        tracing::debug!(
            label = credential.label(),
            version = self.version.number(),
            "Credential selected"
        );

        let key = unwrap_key(self, credential)?;
        let plaintext = Zeroizing::new(decrypt_payload(self, &key)?);
        let records = parse_container(&plaintext)?;

        for r in records.response_records() {
            tracing::warn!(
                tag = format!("{:#018x}", r.tag()),
                name = r.name(),
                "Response-only record found in SPC"
            );
        }
        tracing::info!(records = records.len(), "SPC payload decrypted");

        Ok(OpenedSpc {
            envelope: self.clone(),
            credential,
            records,
        })
    }
}
