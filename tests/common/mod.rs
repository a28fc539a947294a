#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use spcparse::credentials::Credential;
use spcparse::kex::{AuthorityStatus, DerivationOutput, DerivationRequest, KeyDerivationAuthority};

pub const PAYLOAD_KEY: [u8; 16] = *b"0123456789abcdef";
pub const IV: [u8; 16] = [0x42; 16];

/// One TLLV record: tag, block length, value length, value, zero padding.
pub fn frame(tag: u64, value: &[u8], block_len: usize) -> Vec<u8> {
    let mut out = tag.to_be_bytes().to_vec();
    out.extend_from_slice(&(block_len as u32).to_be_bytes());
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(value);
    out.resize(16 + block_len, 0);
    out
}

/// DER-looking certificate of exactly `len` bytes.
pub fn fake_cert(len: usize, fill: u8) -> Vec<u8> {
    let mut c = vec![0x30, 0x82];
    c.extend_from_slice(&((len - 4) as u16).to_be_bytes());
    c.resize(len, fill);
    c
}

pub fn sha1(bytes: &[u8]) -> [u8; 20] {
    Sha1::digest(bytes).into()
}

/// Key pairs shared by every test in one binary.
pub fn keys() -> &'static (RsaPrivateKey, RsaPrivateKey) {
    static KEYS: OnceLock<(RsaPrivateKey, RsaPrivateKey)> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = rand::thread_rng();
        (
            RsaPrivateKey::new(&mut rng, 1024).unwrap(),
            RsaPrivateKey::new(&mut rng, 2048).unwrap(),
        )
    })
}

pub struct Server {
    pub credential: Credential,
    pub cert_1024: Vec<u8>,
    pub cert_2048: Vec<u8>,
    pub bundle: Vec<u8>,
}

/// A credential with both keys and a two-certificate bundle. `fill` makes
/// the certificates, and so the fingerprints, distinct per server.
pub fn server(label: &str, fill: u8) -> Server {
    let (k1024, k2048) = keys();
    let cert_1024 = fake_cert(64, fill);
    let cert_2048 = fake_cert(96, fill.wrapping_add(1));
    let bundle = [cert_1024.clone(), cert_2048.clone()].concat();
    let credential = Credential::new(
        label,
        Some(k1024.clone()),
        Some(k2048.clone()),
        &bundle,
        vec![0xD0; 32],
    )
    .unwrap();
    Server {
        credential,
        cert_1024,
        cert_2048,
        bundle,
    }
}

pub fn encrypt_payload(plain: &[u8]) -> Vec<u8> {
    cbc::Encryptor::<aes::Aes128>::new_from_slices(&PAYLOAD_KEY, &IV)
        .unwrap()
        .encrypt_padded_vec_mut::<NoPadding>(plain)
}

/// Assemble an SPC around `plain`, wrapping the payload key for `version`.
pub fn build_spc(version: u32, cert_hash: [u8; 20], plain: &[u8]) -> Vec<u8> {
    let (k1024, k2048) = keys();
    let mut rng = rand::thread_rng();
    let wrapped = match version {
        1 => RsaPublicKey::from(k1024).encrypt(&mut rng, Oaep::new::<Sha1>(), &PAYLOAD_KEY),
        _ => RsaPublicKey::from(k2048).encrypt(&mut rng, Oaep::new::<Sha256>(), &PAYLOAD_KEY),
    }
    .unwrap();
    let payload = encrypt_payload(plain);

    let mut out = version.to_be_bytes().to_vec();
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&IV);
    out.extend_from_slice(&wrapped);
    out.extend_from_slice(&cert_hash);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Minimal payload: protocol version 1 padded to a block, and a 112-byte session key.
pub fn minimal_payload() -> Vec<u8> {
    use spcparse::tllv::registry::{TAG_PROTOCOL_VERSION_USED, TAG_SESSION_KEY_R1};
    let mut plain = frame(TAG_PROTOCOL_VERSION_USED, &1u32.to_be_bytes(), 16);
    plain.extend(frame(TAG_SESSION_KEY_R1, &[0x5A; 112], 112));
    plain
}

/// Deterministic authority that counts calls and keeps the last request.
pub struct StubAuthority {
    pub calls: AtomicUsize,
    pub integrity: Option<[u8; 16]>,
    pub status: i32,
    pub last: Mutex<Option<DerivationRequest>>,
}

impl StubAuthority {
    pub fn ok() -> Self {
        Self::with(None, 0)
    }

    pub fn with(integrity: Option<[u8; 16]>, status: i32) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            integrity,
            status,
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl KeyDerivationAuthority for StubAuthority {
    fn derive(&self, request: &DerivationRequest) -> Result<DerivationOutput, AuthorityStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        if self.status != 0 {
            return Err(AuthorityStatus(self.status));
        }
        Ok(DerivationOutput {
            r1: [0x11; 44],
            hu: [0x22; 20],
            integrity: self.integrity,
        })
    }
}
