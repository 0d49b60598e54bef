use std::collections::BTreeMap;

use crate::error::BridgeError;
use crate::module::{split_qualified, Export, Module, ModuleRegistry};
use crate::value::GuestValue;

/// A guest execution scope.
///
/// Modules become visible by name only after [`Session::import`], as in the
/// guest language; the registry itself is shared and never modified.
#[derive(Debug)]
pub struct Session<'r> {
    registry: &'r ModuleRegistry,
    bindings: BTreeMap<String, &'r Module>,
}

impl<'r> Session<'r> {
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self {
            registry,
            bindings: BTreeMap::new(),
        }
    }

    /// `import name`
    pub fn import(&mut self, name: &str) -> Result<&'r Module, BridgeError> {
        self.import_as(name, name)
    }

    /// `import name as alias`
    pub fn import_as(&mut self, name: &str, alias: &str) -> Result<&'r Module, BridgeError> {
        let module = self.registry.import(name)?;
        self.bindings.insert(alias.to_string(), module);
        Ok(module)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Names bound in this session, sorted.
    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn lookup(&self, qualified: &str) -> Result<&'r Export, BridgeError> {
        let (binding, attr) = split_qualified(qualified)?;
        let module = self
            .bindings
            .get(binding)
            .copied()
            .ok_or_else(|| BridgeError::NameNotFound(binding.to_string()))?;
        module.attr(attr)
    }

    pub fn call(&self, qualified: &str, args: &[GuestValue]) -> Result<GuestValue, BridgeError> {
        self.lookup(qualified)?.call(args)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bridge::FaultPolicy;
    use crate::host::RecordingHost;
    use crate::module::{console_module, RegistryBuilder};

    fn registry(host: Arc<RecordingHost>) -> ModuleRegistry {
        RegistryBuilder::new()
            .module(console_module("jsffi", "console_log", host, FaultPolicy::Raise))
            .build()
            .unwrap()
    }

    #[test]
    fn test_call_requires_import() {
        let host = Arc::new(RecordingHost::new());
        let registry = registry(host.clone());
        let mut session = Session::new(&registry);

        let err = session
            .call("jsffi.console_log", &[GuestValue::str("early")])
            .unwrap_err();
        assert_eq!(err, BridgeError::NameNotFound("jsffi".to_string()));

        session.import("jsffi").unwrap();
        assert!(session.is_bound("jsffi"));
        let result = session
            .call("jsffi.console_log", &[GuestValue::str("hello")])
            .unwrap();
        assert_eq!(result, GuestValue::Int(0));
        assert_eq!(host.observed(), vec![b"hello".to_vec()]);
    }

    #[test]
    fn test_import_unknown_module() {
        let registry = registry(Arc::new(RecordingHost::new()));
        let mut session = Session::new(&registry);
        assert_eq!(
            session.import("json").unwrap_err(),
            BridgeError::ModuleNotFound("json".to_string())
        );
        assert_eq!(session.bound_names().count(), 0);
    }

    #[test]
    fn test_import_as_alias() {
        let host = Arc::new(RecordingHost::new());
        let registry = registry(host.clone());
        let mut session = Session::new(&registry);
        session.import_as("jsffi", "js").unwrap();

        assert!(!session.is_bound("jsffi"));
        session.call("js.console_log", &[GuestValue::str("aliased")]).unwrap();
        assert_eq!(host.call_count(), 1);
        match session.lookup("js.__name__").unwrap() {
            Export::Value(value) => assert_eq!(value, &GuestValue::str("jsffi")),
            other => panic!("unexpected export {other:?}"),
        }
    }

    #[test]
    fn test_sessions_do_not_share_bindings() {
        let registry = registry(Arc::new(RecordingHost::new()));
        let mut first = Session::new(&registry);
        first.import("jsffi").unwrap();
        let second = Session::new(&registry);
        assert!(first.is_bound("jsffi"));
        assert!(!second.is_bound("jsffi"));
    }
}
