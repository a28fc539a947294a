use crate::credentials::CredentialError;
use crate::kex::KexError;
use crate::spc::SpcError;
use crate::tllv::TllvError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SPC: {0}")]
    Spc(#[from] SpcError),
    #[error("TLLV: {0}")]
    Tllv(#[from] TllvError),
    #[error("key exchange: {0}")]
    Kex(#[from] KexError),
    #[error("credentials: {0}")]
    Credentials(#[from] CredentialError),
}

/// Failure classes a host can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed message: short buffer, bad length, reserved bytes set, bad record.
    Structural,
    /// No configured credential matches the message.
    CredentialMismatch,
    /// Key unwrap, payload decryption or key derivation failed.
    Crypto,
    /// The integrity value does not match; possible tampering.
    Integrity,
    /// Credential configuration could not be loaded.
    Configuration,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Spc(e) => match e {
                SpcError::NoMatchingCredential(_) | SpcError::MissingKey { .. } => {
                    ErrorKind::CredentialMismatch
                }
                SpcError::KeyUnwrap(_) | SpcError::KeyLength(_) | SpcError::PayloadDecrypt => {
                    ErrorKind::Crypto
                }
                SpcError::Truncated { .. }
                | SpcError::UnsupportedVersion(_)
                | SpcError::ReservedNotZero
                | SpcError::PayloadLength { .. }
                | SpcError::PayloadNotBlockAligned(_)
                | SpcError::Payload(_) => ErrorKind::Structural,
            },
            Self::Tllv(_) => ErrorKind::Structural,
            Self::Kex(e) => match e {
                KexError::MissingRecord(_) => ErrorKind::Structural,
                KexError::IntegrityMismatch => ErrorKind::Integrity,
                KexError::DerivationFailed(_) | KexError::Timeout(_) | KexError::Aborted => {
                    ErrorKind::Crypto
                }
            },
            Self::Credentials(_) => ErrorKind::Configuration,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
