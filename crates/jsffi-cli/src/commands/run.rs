//! `jsffi run <script>`: execute a guest script line by line.

use std::path::Path;

use anyhow::{Context, Result};
use jsffi_core::{ModuleRegistry, Session};
use tracing::info;

use crate::script;

pub fn run(registry: &ModuleRegistry, path: &Path, echo: bool) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;

    let mut session = Session::new(registry);
    let mut stdout = std::io::stdout();
    let calls = script::execute(&source, &mut session, echo, &mut stdout)
        .with_context(|| format!("{} failed", path.display()))?;

    info!(script = %path.display(), calls, "script finished");
    Ok(())
}
