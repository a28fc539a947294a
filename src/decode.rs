use std::sync::Arc;
use std::time::Duration;

use crate::credentials::Credential;
use crate::error::Error;
use crate::kex::{self, DerivedSession, KeyDerivationAuthority};
use crate::spc::SpcEnvelope;
use crate::tllv::RecordSet;

/// Everything recovered from one SPC.
#[derive(Debug)]
pub struct DecodedSpc {
    pub envelope: SpcEnvelope,
    pub credential_label: String,
    pub records: RecordSet,
    pub session: DerivedSession,
}

/// Ingest, open and run the key exchange for one SPC message.
pub async fn decode_spc(
    input: &[u8],
    credentials: &[Credential],
    authority: Arc<dyn KeyDerivationAuthority>,
    timeout: Duration,
) -> Result<DecodedSpc, Error> {
    let envelope = SpcEnvelope::ingest(input)?;
    let opened = envelope.open(credentials)?;
    let session = kex::exchange(&opened, authority, timeout).await?;
    Ok(DecodedSpc {
        credential_label: opened.credential.label().to_string(),
        envelope: opened.envelope,
        records: opened.records,
        session,
    })
}
