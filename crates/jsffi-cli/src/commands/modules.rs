//! `jsffi modules`: list the registry's modules and their attributes.

use anyhow::{Context, Result};
use jsffi_core::{Export, ModuleRegistry};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ModuleListing<'a> {
    name: &'a str,
    attrs: Vec<AttrListing<'a>>,
}

#[derive(Debug, Serialize)]
struct AttrListing<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    arity: Option<usize>,
}

fn listing(registry: &ModuleRegistry) -> Vec<ModuleListing<'_>> {
    registry
        .modules()
        .map(|module| ModuleListing {
            name: module.name(),
            attrs: module
                .attrs()
                .map(|(name, export)| AttrListing {
                    name,
                    type_name: export.type_name(),
                    arity: match export {
                        Export::Function(function) => Some(function.arity()),
                        Export::Value(_) => None,
                    },
                })
                .collect(),
        })
        .collect()
}

pub fn run(registry: &ModuleRegistry, json: bool) -> Result<()> {
    let modules = listing(registry);

    if json {
        let out = serde_json::to_string_pretty(&modules).context("failed to serialize listing")?;
        println!("{out}");
        return Ok(());
    }

    for module in &modules {
        println!("{}", module.name);
        for attr in &module.attrs {
            match attr.arity {
                Some(arity) => println!("  {:<16} {} ({arity} arg)", attr.name, attr.type_name),
                None => println!("  {:<16} {}", attr.name, attr.type_name),
            }
        }
    }
    Ok(())
}
