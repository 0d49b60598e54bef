//! `jsffi init-config`: write a default config file.

use std::path::Path;

use anyhow::{bail, Result};
use jsffi_core::Config;
use tracing::info;

use crate::config;

pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    config::save(&Config::default(), path)?;
    info!(path = %path.display(), "config written");
    println!("Wrote default config to {}", path.display());
    Ok(())
}
