//! Guest modules and the registry the module loader imports them from.
//!
//! Registries are assembled once with [`RegistryBuilder`] during start-up,
//! handed to the loader, and never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::bridge::{Bridge, FaultPolicy};
use crate::error::BridgeError;
use crate::host::HostFunction;
use crate::value::GuestValue;

pub const DEFAULT_MODULE_NAME: &str = "jsffi";
pub const DEFAULT_CONSOLE_FUNCTION: &str = "console_log";

/// A function implemented natively and callable from guest code.
pub trait NativeFunction: Send + Sync {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    fn call(&self, args: &[GuestValue]) -> Result<GuestValue, BridgeError>;
}

/// One entry in a module's attribute table.
#[derive(Clone)]
pub enum Export {
    Value(GuestValue),
    Function(Arc<dyn NativeFunction>),
}

impl Export {
    pub fn type_name(&self) -> &'static str {
        match self {
            Export::Value(value) => value.type_name(),
            Export::Function(_) => "function",
        }
    }

    pub fn call(&self, args: &[GuestValue]) -> Result<GuestValue, BridgeError> {
        match self {
            Export::Function(function) => function.call(args),
            Export::Value(value) => Err(BridgeError::NotCallable(value.type_name())),
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Export::Function(function) => f
                .debug_struct("Function")
                .field("name", &function.name())
                .field("arity", &function.arity())
                .finish(),
        }
    }
}

/// An importable namespace.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    attrs: BTreeMap<String, Export>,
}

impl Module {
    pub fn builder(name: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, attr: &str) -> Result<&Export, BridgeError> {
        self.attrs
            .get(attr)
            .ok_or_else(|| BridgeError::AttributeNotFound {
                module: self.name.clone(),
                attr: attr.to_string(),
            })
    }

    /// Attributes in name order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.attrs.iter().map(|(name, export)| (name.as_str(), export))
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut attrs = BTreeMap::new();
        attrs.insert(
            "__name__".to_string(),
            Export::Value(GuestValue::str(name.clone())),
        );
        Self {
            module: Module { name, attrs },
        }
    }

    pub fn value(mut self, name: impl Into<String>, value: GuestValue) -> Self {
        self.module.attrs.insert(name.into(), Export::Value(value));
        self
    }

    pub fn function(mut self, name: impl Into<String>, function: Arc<dyn NativeFunction>) -> Self {
        self.module
            .attrs
            .insert(name.into(), Export::Function(function));
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}

/// Build the console module: `__name__` plus one bridged logging function.
pub fn console_module(
    module_name: &str,
    function_name: &str,
    host: Arc<dyn HostFunction>,
    policy: FaultPolicy,
) -> Module {
    let bridge = Bridge::new(host, policy).named(function_name);
    ModuleBuilder::new(module_name)
        .function(function_name, Arc::new(bridge))
        .build()
}

/// Errors assembling a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("module '{0}' registered more than once")]
    DuplicateModule(String),
    #[error("invalid module name: {0:?}")]
    InvalidName(String),
}

#[derive(Default)]
pub struct RegistryBuilder {
    modules: Vec<Module>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        let mut modules = BTreeMap::new();
        for module in self.modules {
            if module.name.is_empty() || module.name.contains('.') {
                return Err(RegistryError::InvalidName(module.name));
            }
            if modules.contains_key(&module.name) {
                return Err(RegistryError::DuplicateModule(module.name));
            }
            modules.insert(module.name.clone(), module);
        }
        tracing::debug!(modules = modules.len(), "module registry built");
        Ok(ModuleRegistry { modules })
    }
}

/// Immutable name → module table consumed by the module loader.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Module>,
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn import(&self, name: &str) -> Result<&Module, BridgeError> {
        self.modules
            .get(name)
            .ok_or_else(|| BridgeError::ModuleNotFound(name.to_string()))
    }

    /// Resolve `module.attr` without any import scoping.
    pub fn resolve(&self, qualified: &str) -> Result<&Export, BridgeError> {
        let (module, attr) = split_qualified(qualified)?;
        self.import(module)?.attr(attr)
    }

    pub fn call(&self, qualified: &str, args: &[GuestValue]) -> Result<GuestValue, BridgeError> {
        self.resolve(qualified)?.call(args)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Split `module.attr` at the last dot.
pub(crate) fn split_qualified(qualified: &str) -> Result<(&str, &str), BridgeError> {
    match qualified.rsplit_once('.') {
        Some((module, attr)) if !module.is_empty() && !attr.is_empty() => Ok((module, attr)),
        _ => Err(BridgeError::NameNotFound(qualified.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;

    fn jsffi_registry() -> (ModuleRegistry, Arc<RecordingHost>) {
        let host = Arc::new(RecordingHost::new());
        let module = console_module(
            DEFAULT_MODULE_NAME,
            DEFAULT_CONSOLE_FUNCTION,
            host.clone(),
            FaultPolicy::Raise,
        );
        let registry = RegistryBuilder::new().module(module).build().unwrap();
        (registry, host)
    }

    #[test]
    fn test_console_module_table() {
        let (registry, _) = jsffi_registry();
        let module = registry.import("jsffi").unwrap();
        assert_eq!(module.name(), "jsffi");
        assert_eq!(module.len(), 2);

        let names: Vec<&str> = module.attrs().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["__name__", "console_log"]);

        match module.attr("__name__").unwrap() {
            Export::Value(value) => assert_eq!(value, &GuestValue::str("jsffi")),
            other => panic!("unexpected export {other:?}"),
        }
        assert_eq!(module.attr("console_log").unwrap().type_name(), "function");
    }

    #[test]
    fn test_qualified_call_reaches_host() {
        let (registry, host) = jsffi_registry();
        let result = registry
            .call("jsffi.console_log", &[GuestValue::str("hello")])
            .unwrap();
        assert_eq!(result, GuestValue::Int(0));
        assert_eq!(host.observed(), vec![b"hello".to_vec()]);
    }

    #[test]
    fn test_lookup_errors() {
        let (registry, host) = jsffi_registry();
        assert_eq!(
            registry.call("os.getcwd", &[]).unwrap_err(),
            BridgeError::ModuleNotFound("os".to_string())
        );
        assert_eq!(
            registry.call("jsffi.alert", &[]).unwrap_err(),
            BridgeError::AttributeNotFound {
                module: "jsffi".to_string(),
                attr: "alert".to_string(),
            }
        );
        assert_eq!(
            registry.call("jsffi.__name__", &[]).unwrap_err(),
            BridgeError::NotCallable("str")
        );
        assert_eq!(
            registry.call("console_log", &[]).unwrap_err(),
            BridgeError::NameNotFound("console_log".to_string())
        );
        assert_eq!(host.call_count(), 0);
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let err = RegistryBuilder::new()
            .module(Module::builder("jsffi").build())
            .module(Module::builder("jsffi").build())
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateModule("jsffi".to_string()));
    }

    #[test]
    fn test_invalid_module_name_rejected() {
        let err = RegistryBuilder::new()
            .module(Module::builder("a.b").build())
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::InvalidName("a.b".to_string()));
    }

    #[test]
    fn test_registry_names_sorted() {
        let registry = ModuleRegistry::builder()
            .module(Module::builder("zeta").build())
            .module(Module::builder("alpha").value("answer", GuestValue::Int(42)).build())
            .build()
            .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
        assert_eq!(registry.len(), 2);
        match registry.resolve("alpha.answer").unwrap() {
            Export::Value(value) => assert_eq!(value.as_int(), Some(42)),
            other => panic!("unexpected export {other:?}"),
        }
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("a.b").unwrap(), ("a", "b"));
        assert!(split_qualified(".b").is_err());
        assert!(split_qualified("a.").is_err());
        assert!(split_qualified("ab").is_err());
    }
}
