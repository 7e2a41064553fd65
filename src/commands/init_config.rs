use crate::config::Config;
use anyhow::{bail, Context, Result};

pub fn run(force: bool) -> Result<()> {
    let path = Config::default_path().context("Could not determine a config directory")?;
    if path.exists() && !force {
        bail!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    let path = Config::default().save()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
