use crate::config::Config;

pub fn check(cfg: &Config) -> anyhow::Result<()> {
    let mut errors: Vec<String> = Vec::new();

    // Unreadable SPC inputs are reported per message by `run`, not here.

    // Check 1: credential configuration present
    let creds = cfg.credentials_path()?;
    if !creds.is_file() {
        errors.push(format!(
            "credential configuration not found: {}\n  \
             → pass --credentials <PATH> or create it",
            creds.display()
        ));
    }

    // Check 2: sane timeout
    if cfg.kex_timeout == 0 {
        errors.push("--kex-timeout must be at least 1 second".to_string());
    }

    if errors.is_empty() {
        return Ok(());
    }

    for err in &errors {
        eprintln!("ERROR: {err}");
    }
    anyhow::bail!("{} preflight check(s) failed", errors.len());
}
