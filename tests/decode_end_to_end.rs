mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::*;
use spcparse::kex::{
    AuthorityStatus, DerivationOutput, DerivationRequest, IntegrityCheck, KexError,
    KeyDerivationAuthority,
};
use spcparse::spc::SpcError;
use spcparse::tllv::registry::*;
use spcparse::{Error, ErrorKind, decode_spc};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_v1_minimal_spc_decodes() {
    let srv = server("primary", 0xA0);
    let spc = build_spc(1, sha1(&srv.cert_1024), &minimal_payload());
    let stub = Arc::new(StubAuthority::ok());

    let decoded = decode_spc(&spc, &[srv.credential], stub.clone(), TIMEOUT).await.unwrap();

    assert_eq!(decoded.credential_label, "primary");
    let fields: Vec<&str> = decoded.records.iter().map(|r| r.descriptor().field).collect();
    assert_eq!(fields, vec!["protocol_versions_used", "sk_r1"]);
    assert_eq!(decoded.records.protocol_version_used(), Some(1));
    assert_eq!(stub.calls(), 1);
    assert_eq!(decoded.session.r1.len(), 44);
    assert_eq!(decoded.session.hu, [0x22; 20]);
    assert_eq!(decoded.session.integrity, IntegrityCheck::Absent);

    let req = stub.last.lock().unwrap().clone().unwrap();
    assert_eq!(req.session_key, vec![0x5A; 112]);
    assert_eq!(req.cert_hash, sha1(&srv.cert_1024));
    assert_eq!(req.provisioning_data, vec![0xD0; 32]);
}

#[tokio::test]
async fn test_v1_legacy_full_bundle_hash_matches() {
    let srv = server("legacy", 0xA2);
    let spc = build_spc(1, sha1(&srv.bundle), &minimal_payload());
    let stub = Arc::new(StubAuthority::ok());
    let decoded = decode_spc(&spc, &[srv.credential], stub, TIMEOUT).await.unwrap();
    assert_eq!(decoded.credential_label, "legacy");
}

#[tokio::test]
async fn test_v2_spc_decodes() {
    let srv = server("v2", 0xB0);
    let spc = build_spc(2, sha1(&srv.cert_2048), &minimal_payload());
    let stub = Arc::new(StubAuthority::ok());
    let decoded = decode_spc(&spc, &[srv.credential], stub.clone(), TIMEOUT).await.unwrap();
    assert_eq!(decoded.envelope.version, spcparse::spc::SpcVersion::V2);
    assert_eq!(decoded.records.len(), 2);
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_integrity_match_is_verified() {
    let srv = server("integrity", 0xC0);
    let mut plain = minimal_payload();
    plain.extend(frame(TAG_SESSION_KEY_R1_INTEGRITY, &[0x77; 16], 16));
    let spc = build_spc(1, sha1(&srv.cert_1024), &plain);
    let stub = Arc::new(StubAuthority::with(Some([0x77; 16]), 0));

    let decoded = decode_spc(&spc, &[srv.credential], stub, TIMEOUT).await.unwrap();
    assert_eq!(decoded.session.integrity, IntegrityCheck::Verified);
}

#[tokio::test]
async fn test_integrity_mismatch_is_reported() {
    let srv = server("integrity", 0xC0);
    let mut plain = minimal_payload();
    plain.extend(frame(TAG_SESSION_KEY_R1_INTEGRITY, &[0x77; 16], 16));
    let spc = build_spc(1, sha1(&srv.cert_1024), &plain);
    let stub = Arc::new(StubAuthority::with(Some([0x78; 16]), 0));

    let err = decode_spc(&spc, &[srv.credential], stub, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::Kex(KexError::IntegrityMismatch)));
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[tokio::test]
async fn test_integrity_unchecked_when_authority_is_silent() {
    let srv = server("silent", 0xC2);
    let mut plain = minimal_payload();
    plain.extend(frame(TAG_SESSION_KEY_R1_INTEGRITY, &[0x77; 16], 16));
    let spc = build_spc(1, sha1(&srv.cert_1024), &plain);
    let stub = Arc::new(StubAuthority::with(None, 0));

    let decoded = decode_spc(&spc, &[srv.credential], stub, TIMEOUT).await.unwrap();
    assert_eq!(decoded.session.integrity, IntegrityCheck::Unchecked);
    assert!(decoded.session.to_string().contains("integrity: not verified by authority"));
}

#[tokio::test]
async fn test_authority_failure_is_crypto_error() {
    let srv = server("fail", 0xC4);
    let spc = build_spc(1, sha1(&srv.cert_1024), &minimal_payload());
    let stub = Arc::new(StubAuthority::with(None, -1));
    let err = decode_spc(&spc, &[srv.credential], stub.clone(), TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::Kex(KexError::DerivationFailed(_))));
    assert_eq!(err.kind(), ErrorKind::Crypto);
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_payload_length_mismatch_is_structural() {
    let srv = server("len", 0xD0);
    let mut spc = build_spc(1, sha1(&srv.cert_1024), &minimal_payload());
    spc.extend_from_slice(&[0u8; 16]);
    let stub = Arc::new(StubAuthority::ok());

    let err = decode_spc(&spc, &[srv.credential], stub.clone(), TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::Spc(SpcError::PayloadLength { declared: 160, actual: 176 })));
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_unknown_fingerprint_is_credential_mismatch() {
    let srv = server("other", 0xE0);
    let spc = build_spc(1, [0xFF; 20], &minimal_payload());
    let stub = Arc::new(StubAuthority::ok());
    let err = decode_spc(&spc, &[srv.credential], stub.clone(), TIMEOUT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialMismatch);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_bad_record_aborts_before_key_exchange() {
    let srv = server("bad", 0xE4);
    let mut plain = minimal_payload();
    // 15-byte anti-replay seed: the tag requires exactly 16
    plain.extend(frame(TAG_ANTI_REPLAY_SEED, &[0x01; 15], 16));
    let spc = build_spc(1, sha1(&srv.cert_1024), &plain);
    let stub = Arc::new(StubAuthority::ok());

    let err = decode_spc(&spc, &[srv.credential], stub.clone(), TIMEOUT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_missing_session_key_is_structural() {
    let srv = server("nosk", 0xE8);
    let plain = frame(TAG_PROTOCOL_VERSION_USED, &1u32.to_be_bytes(), 16);
    let spc = build_spc(1, sha1(&srv.cert_1024), &plain);
    let stub = Arc::new(StubAuthority::ok());

    let err = decode_spc(&spc, &[srv.credential], stub, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::Kex(KexError::MissingRecord("sk_r1"))));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

struct Hung;

impl KeyDerivationAuthority for Hung {
    fn derive(&self, _: &DerivationRequest) -> Result<DerivationOutput, AuthorityStatus> {
        loop {
            std::thread::park();
        }
    }
}

#[test]
fn test_hung_authority_does_not_block_shutdown() {
    let srv = server("hung", 0xEC);
    let spc = build_spc(1, sha1(&srv.cert_1024), &minimal_payload());
    let started = Instant::now();

    let result = spcparse::block_on(async move {
        decode_spc(&spc, &[srv.credential], Arc::new(Hung), Duration::from_millis(100)).await
    })
    .unwrap();

    assert!(matches!(result, Err(Error::Kex(KexError::Timeout(_)))));
    assert!(started.elapsed() < Duration::from_secs(5));
}
