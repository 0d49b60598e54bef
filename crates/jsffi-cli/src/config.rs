//! CLI configuration at `~/.jsffi/config.toml`.
//!
//! Same structure as the JSON config the WASM module accepts. A missing file
//! means defaults; CLI flags override file values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsffi_core::Config;
use tracing::debug;

pub fn default_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_default();
    home.join(".jsffi").join("config.toml")
}

/// Load and validate configuration from a TOML file, returning defaults if
/// the file does not exist.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config = parse(&content)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;

    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn parse(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Write `config` as TOML, creating parent directories.
pub fn save(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).context("failed to serialize config")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write config to {}", path.display()))?;

    Ok(())
}
