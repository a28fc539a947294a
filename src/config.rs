use std::path::PathBuf;

/// Key format assumed when the client sends no supported-key-formats record.
pub const DEFAULT_KEY_FORMAT: u64 = 0x58b38165af0e3d5a;
pub const KEX_TIMEOUT_SECS: u64 = 10;
/// How long shutdown waits for a key derivation that outlived its timeout.
pub const SHUTDOWN_GRACE_SECS: u64 = 1;
pub const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

/// Decode and inspect FairPlay Streaming SPC messages.
#[derive(clap::Parser, Debug, Clone)]
#[command(version)]
pub struct Config {
    /// SPC file(s), raw binary or base64.
    #[arg(long, required = true, num_args = 1..)]
    pub spc: Vec<PathBuf>,
    /// Credential configuration (JSON). Defaults to credentials.json in the
    /// user config directory.
    #[arg(long)]
    pub credentials: Option<PathBuf>,
    /// Companion CKC response. Accepted but not decoded.
    #[arg(long)]
    pub ckc: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "info")]
    pub log: LogLevel,
    /// Seconds to wait for the key-derivation authority.
    #[arg(long, default_value_t = KEX_TIMEOUT_SECS)]
    pub kex_timeout: u64,
}

impl Config {
    pub fn credentials_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(p) = &self.credentials {
            return Ok(p.clone());
        }
        let dirs = directories::ProjectDirs::from("", "", "spcparse")
            .ok_or_else(|| anyhow::anyhow!("cannot determine config dir"))?;
        Ok(dirs.config_dir().join(CREDENTIALS_FILE))
    }
}
