// validate.rs — Report what normalization changed in a policy file.

use std::path::Path;

use anyhow::Context;
use dg_config::load_path;

pub fn execute(config: &Path) -> anyhow::Result<()> {
    let normalized = load_path(config)
        .with_context(|| format!("failed to load policy from {}", config.display()))?;
    let fingerprint = normalized.config.fingerprint()?;

    if normalized.warnings.is_empty() {
        println!("{}: ok (mode {})", config.display(), normalized.config.mode);
    } else {
        println!(
            "{}: {} adjustment(s) (mode {})",
            config.display(),
            normalized.warnings.len(),
            normalized.config.mode
        );
        for warning in &normalized.warnings {
            println!("  - {}", warning);
        }
    }
    println!("fingerprint: {}", fingerprint);
    Ok(())
}
