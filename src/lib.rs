pub mod config;
pub mod credentials;
pub mod decode;
pub mod diagnostics;
pub mod display;
pub mod error;
pub mod kex;
pub mod spc;
pub mod tllv;

use std::sync::Arc;
use std::time::Duration;

pub use decode::{DecodedSpc, decode_spc};
pub use error::{Error, ErrorKind};

use credentials::Credential;
use kex::KeyDerivationAuthority;
use spc::SpcEnvelope;

/// The authority compiled into this build, if any.
pub fn default_authority() -> Option<Arc<dyn KeyDerivationAuthority>> {
    #[cfg(feature = "fpscrypto")]
    {
        Some(Arc::new(kex::NativeAuthority))
    }
    #[cfg(not(feature = "fpscrypto"))]
    {
        None
    }
}

/// Drive `fut` to completion on a multi-thread runtime.
///
/// An authority call abandoned by its timeout keeps its blocking thread, so
/// the runtime is shut down with a bounded grace period instead of dropped.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let out = rt.block_on(fut);
    rt.shutdown_timeout(Duration::from_secs(config::SHUTDOWN_GRACE_SECS));
    Ok(out)
}

pub async fn run(cfg: config::Config) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log.directive()))
        .init();

    // Preflight checks
    diagnostics::check(&cfg)?;

    let creds_path = cfg.credentials_path()?;
    let credentials = credentials::load_credentials(&creds_path)
        .map_err(|e| anyhow::anyhow!("Failed to load credentials: {e}"))?;
    if credentials.is_empty() {
        anyhow::bail!("no usable credentials in {}", creds_path.display());
    }
    tracing::info!(count = credentials.len(), "Credentials loaded");

    let authority = default_authority();
    if authority.is_none() {
        tracing::warn!("Built without fpscrypto; R1 and HU will not be derived");
    }
    let timeout = Duration::from_secs(cfg.kex_timeout);

    let mut failed = 0usize;
    for path in &cfg.spc {
        let input = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Cannot read SPC");
                failed += 1;
                continue;
            }
        };
        println!("==> {}", path.display());
        if let Err(e) = inspect(&input, &credentials, authority.clone(), timeout).await {
            failed += 1;
            match e.kind() {
                ErrorKind::Integrity => {
                    tracing::error!(path = %path.display(), error = %e, "INTEGRITY CHECK FAILED");
                    println!("!! INTEGRITY CHECK FAILED: {e}");
                }
                kind => {
                    tracing::error!(path = %path.display(), ?kind, error = %e, "SPC decode failed");
                }
            }
        }
    }

    if let Some(ckc) = &cfg.ckc {
        tracing::warn!(path = %ckc.display(), "CKC decoding is not supported");
        println!("==> {}
CKC: decoding unavailable", ckc.display());
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} SPC message(s) failed", cfg.spc.len());
    }
    Ok(())
}

/// Decode one message and print each stage as it completes.
async fn inspect(
    input: &[u8],
    credentials: &[Credential],
    authority: Option<Arc<dyn KeyDerivationAuthority>>,
    timeout: Duration,
) -> Result<(), Error> {
    let envelope = SpcEnvelope::ingest(input)?;
    print!("{envelope}");

    let opened = envelope.open(credentials)?;
    println!("Credential: {}", opened.credential.label());
    print!("{}", opened.records);

    match authority {
        Some(authority) => {
            let session = kex::exchange(&opened, authority, timeout).await;
            match session {
                Ok(s) => print!("{s}"),
                Err(e) => {
                    println!("HU: unavailable\nR1: unavailable");
                    return Err(e.into());
                }
            }
        }
        None => println!("HU: unavailable\nR1: unavailable"),
    }
    Ok(())
}
