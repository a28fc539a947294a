pub mod adapter;
pub mod authority;

pub use adapter::{DerivedSession, IntegrityCheck, build_request, exchange};
pub use authority::{
    AuthorityStatus, DerivationOutput, DerivationRequest, KeyDerivationAuthority,
};
#[cfg(feature = "fpscrypto")]
pub use authority::NativeAuthority;

#[derive(Debug, thiserror::Error)]
pub enum KexError {
    #[error("required record {0:?} is missing")]
    MissingRecord(&'static str),
    #[error("derivation failed: {0}")]
    DerivationFailed(#[from] AuthorityStatus),
    #[error("derivation timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("derivation task aborted")]
    Aborted,
    #[error("integrity check failed: [SK..R1] integrity does not match the derived value")]
    IntegrityMismatch,
}
