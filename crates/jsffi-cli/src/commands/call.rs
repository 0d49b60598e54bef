//! `jsffi call <module.function> [literal...]`: one-shot guest call.

use anyhow::{anyhow, Result};
use jsffi_core::ModuleRegistry;
use tracing::info;

use crate::script;

/// Parse the literal arguments, call `target`, and print the result.
pub fn run(registry: &ModuleRegistry, target: &str, literals: &[String]) -> Result<()> {
    let args = literals
        .iter()
        .map(|literal| script::parse_literal(literal))
        .collect::<Result<Vec<_>, _>>()?;

    info!(function = %target, args = args.len(), "calling guest function");
    let result = registry
        .call(target, &args)
        .map_err(|e| anyhow!(e.to_guest_message()))?;

    println!("{result}");
    Ok(())
}
