//! Create, locate, and print the configuration file.

use std::path::Path;

use steadyhand_common::config::AppConfig;

use crate::engine;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    AppConfig::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

pub fn path(path: &Path) -> anyhow::Result<()> {
    println!("{}", path.display());
    Ok(())
}

pub fn show(path: &Path) -> anyhow::Result<()> {
    let config = engine::load_config(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
