use std::sync::Arc;
use std::time::Duration;

use super::KexError;
use super::authority::{DerivationRequest, HU_LEN, KeyDerivationAuthority};
use crate::config::DEFAULT_KEY_FORMAT;
use crate::credentials::Credential;
use crate::spc::OpenedSpc;
use crate::tllv::RecordSet;
use crate::tllv::record::{R1_LEN, SessionKeyR1};

/// `[SK..R1]` after a successful derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedSession {
    pub session_key: SessionKeyR1,
    /// Derived secret.
    pub r1: [u8; R1_LEN],
    /// Device identifier.
    pub hu: [u8; HU_LEN],
    pub integrity: IntegrityCheck,
}

/// Outcome of comparing the `[SK..R1]` integrity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityCheck {
    /// No integrity record in the SPC.
    Absent,
    /// The record matched the authority's value.
    Verified,
    /// The record was sent but the authority reported no value to compare.
    Unchecked,
}

/// Collect the inputs for one derivation from the decoded records.
pub fn build_request(
    records: &RecordSet,
    credential: &Credential,
    cert_hash: &[u8; 20],
) -> Result<DerivationRequest, KexError> {
    let session_key = records
        .get_field("sk_r1")
        .ok_or(KexError::MissingRecord("sk_r1"))?
        .value()
        .to_vec();
    let protocol_version = records
        .protocol_version_used()
        .ok_or(KexError::MissingRecord("protocol_versions_used"))?;

    let anti_replay = match (records.r2(), records.anti_replay_seed()) {
        (Some(r2), _) => r2.to_vec(),
        (None, Some(seed)) => seed.to_vec(),
        (None, None) => Vec::new(),
    };
    let integrity = records
        .sk_r1_integrity()
        .map(|v| v.to_vec())
        .unwrap_or_default();
    let supported_key_formats = match records.supported_key_formats() {
        Some(f) if !f.formats().is_empty() => f.formats().to_vec(),
        _ => vec![DEFAULT_KEY_FORMAT],
    };

    Ok(DerivationRequest {
        session_key,
        content_key: [0; 16],
        content_iv: [0; 16],
        anti_replay,
        integrity,
        supported_key_formats,
        protocol_version,
        provisioning_data: credential.provisioning_data().to_vec(),
        cert_hash: *cert_hash,
    })
}

/// Run the key exchange for an opened SPC.
///
/// The authority runs on a blocking thread bounded by `timeout`. There is no
/// retry; any failure leaves R1 and HU unknown.
pub async fn exchange(
    opened: &OpenedSpc<'_>,
    authority: Arc<dyn KeyDerivationAuthority>,
    timeout: Duration,
) -> Result<DerivedSession, KexError> {
    let records = &opened.records;
    let session_key = records
        .sk_r1()
        .cloned()
        .ok_or(KexError::MissingRecord("sk_r1"))?;
    let request = build_request(records, opened.credential, &opened.envelope.cert_hash)?;
    tracing::debug!(request = ?request, "Calling key-derivation authority");

    let join = tokio::task::spawn_blocking(move || authority.derive(&request));
    let output = match tokio::time::timeout(timeout, join).await {
        Err(_) => return Err(KexError::Timeout(timeout)),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Key-derivation task failed");
            return Err(KexError::Aborted);
        }
        Ok(Ok(Err(status))) => return Err(KexError::DerivationFailed(status)),
        Ok(Ok(Ok(output))) => output,
    };

    let integrity = match (records.sk_r1_integrity(), output.integrity) {
        (Some(sent), Some(derived)) => {
            if *sent != derived {
                return Err(KexError::IntegrityMismatch);
            }
            IntegrityCheck::Verified
        }
        (Some(_), None) => {
            tracing::warn!("Authority returned no integrity value; [SK..R1] not compared");
            IntegrityCheck::Unchecked
        }
        (None, _) => IntegrityCheck::Absent,
    };
    tracing::info!(?integrity, "Key exchange complete");

    Ok(DerivedSession {
        session_key,
        r1: output.r1,
        hu: output.hu,
        integrity,
    })
}
