pub mod decrypt;
pub mod envelope;

pub use decrypt::{OpenedSpc, select_credential};
pub use envelope::{SpcEnvelope, SpcVersion};

#[derive(Debug, thiserror::Error)]
pub enum SpcError {
    #[error("SPC truncated: {actual} bytes, need at least {needed}")]
    Truncated { needed: usize, actual: usize },
    #[error("unsupported SPC version {0}")]
    UnsupportedVersion(u32),
    #[error("reserved header bytes are not zero")]
    ReservedNotZero,
    #[error("payload length field {declared} does not match the {actual} bytes that follow")]
    PayloadLength { declared: usize, actual: usize },
    #[error("payload of {0} bytes is not a whole number of AES blocks")]
    PayloadNotBlockAligned(usize),
    #[error("no matching credential for certificate hash {0}")]
    NoMatchingCredential(String),
    #[error("credential {label:?} has no {bits}-bit private key")]
    MissingKey { label: String, bits: usize },
    #[error("key unwrap failed")]
    KeyUnwrap(#[source] rsa::Error),
    #[error("unwrapped key is {0} bytes, expected 16")]
    KeyLength(usize),
    #[error("payload decryption failed")]
    PayloadDecrypt,
    #[error("payload: {0}")]
    Payload(#[from] crate::tllv::TllvError),
}
