use crate::tllv::record::{INTEGRITY_LEN, R1_LEN};

pub const HU_LEN: usize = 20;

/// Inputs marshalled for one key derivation. Owned so the call can run on a
/// blocking thread.
#[derive(Clone)]
pub struct DerivationRequest {
    /// The full `[SK..R1]` value: IV followed by the encrypted payload.
    pub session_key: Vec<u8>,
    pub content_key: [u8; 16],
    pub content_iv: [u8; 16],
    /// R2, or the anti-replay seed when R2 is absent.
    pub anti_replay: Vec<u8>,
    /// `[SK..R1]` integrity value as sent by the client; empty when absent.
    pub integrity: Vec<u8>,
    pub supported_key_formats: Vec<u64>,
    pub protocol_version: u32,
    pub provisioning_data: Vec<u8>,
    pub cert_hash: [u8; 20],
}

impl std::fmt::Debug for DerivationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivationRequest")
            .field("session_key_len", &self.session_key.len())
            .field("anti_replay_len", &self.anti_replay.len())
            .field("integrity_len", &self.integrity.len())
            .field("supported_key_formats", &self.supported_key_formats)
            .field("protocol_version", &self.protocol_version)
            .field("provisioning_data_len", &self.provisioning_data.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationOutput {
    pub r1: [u8; R1_LEN],
    pub hu: [u8; HU_LEN],
    /// Integrity value computed by the authority, if it exposes one.
    pub integrity: Option<[u8; INTEGRITY_LEN]>,
}

/// Non-zero status returned by an authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("authority returned status {0}")]
pub struct AuthorityStatus(pub i32);

/// The external component that turns a session blob into R1 and HU.
///
/// Implementations block; callers run them on a blocking thread.
pub trait KeyDerivationAuthority: Send + Sync {
    fn derive(&self, request: &DerivationRequest) -> Result<DerivationOutput, AuthorityStatus>;
}

#[cfg(feature = "fpscrypto")]
mod native {
    use super::*;

    #[repr(C)]
    struct KsmKeyPayload {
        version: u8,
        content_key: *mut u8,
        content_key_len: u64,
        content_iv: *mut u8,
        content_iv_len: u64,
        content_type: u64,
        sk_r1: *const u8,
        sk_r1_len: u64,
        r2: *const u8,
        r2_len: u64,
        r1_integrity: *const u8,
        r1_integrity_len: u64,
        supported_key_formats: *const u64,
        supported_key_formats_count: u64,
        crypto_version_used: u64,
        provisioning_data: *const u8,
        provisioning_data_len: u64,
        cert_hash: *const u8,
        cert_hash_len: u64,
        client_hu: *mut u8,
        client_hu_len: u64,
        content_key_tllv_tag: u64,
        content_key_tllv_payload: *mut u8,
        content_key_tllv_payload_len: u64,
        r1: *mut u8,
        r1_len: u64,
    }

    #[link(name = "fpscrypto")]
    unsafe extern "C" {
        fn KSMCreateKeyPayload(payload: *mut KsmKeyPayload) -> i32;
    }

    const CONTENT_KEY_PAYLOAD_LEN: usize = 1024;

    /// Binding to `libfpscrypto`. Integrity is verified inside the library,
    /// so no integrity value is reported back.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativeAuthority;

    impl KeyDerivationAuthority for NativeAuthority {
        fn derive(
            &self,
            request: &DerivationRequest,
        ) -> Result<DerivationOutput, AuthorityStatus> {
            let mut content_key = request.content_key;
            let mut content_iv = request.content_iv;
            let mut hu = [0u8; HU_LEN];
            let mut r1 = [0u8; R1_LEN];
            let mut ck_payload = vec![0u8; CONTENT_KEY_PAYLOAD_LEN];

            let mut payload = KsmKeyPayload {
                version: 1,
                content_key: content_key.as_mut_ptr(),
                content_key_len: content_key.len() as u64,
                content_iv: content_iv.as_mut_ptr(),
                content_iv_len: content_iv.len() as u64,
                content_type: 0,
                sk_r1: request.session_key.as_ptr(),
                sk_r1_len: request.session_key.len() as u64,
                r2: request.anti_replay.as_ptr(),
                r2_len: request.anti_replay.len() as u64,
                r1_integrity: request.integrity.as_ptr(),
                r1_integrity_len: request.integrity.len() as u64,
                supported_key_formats: request.supported_key_formats.as_ptr(),
                supported_key_formats_count: request.supported_key_formats.len() as u64,
                crypto_version_used: request.protocol_version as u64,
                provisioning_data: request.provisioning_data.as_ptr(),
                provisioning_data_len: request.provisioning_data.len() as u64,
                cert_hash: request.cert_hash.as_ptr(),
                cert_hash_len: request.cert_hash.len() as u64,
                client_hu: hu.as_mut_ptr(),
                client_hu_len: hu.len() as u64,
                content_key_tllv_tag: 0,
                content_key_tllv_payload: ck_payload.as_mut_ptr(),
                content_key_tllv_payload_len: ck_payload.len() as u64,
                r1: r1.as_mut_ptr(),
                r1_len: r1.len() as u64,
            };

            // SAFETY: every pointer refers to a live buffer of the length stored
            // beside it, and all of them outlive the call.
            let status = unsafe { KSMCreateKeyPayload(&mut payload) };
            if status != 0 {
                return Err(AuthorityStatus(status));
            }
            Ok(DerivationOutput {
                r1,
                hu,
                integrity: None,
            })
        }
    }
}

#[cfg(feature = "fpscrypto")]
pub use native::NativeAuthority;
