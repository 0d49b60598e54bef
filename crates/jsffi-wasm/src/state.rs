//! Runtime state owned by the WASM instance between `jsffi_init` and
//! `jsffi_shutdown`.
//!
//! WASM is single-threaded, so the state lives in a thread-local. The
//! registry is reference-counted so a host call can run without holding the
//! state borrow, which keeps re-entrant exports from panicking.

use std::cell::RefCell;
use std::rc::Rc;

use jsffi_core::ModuleRegistry;

/// Everything the exports need after initialization.
pub struct Runtime {
    pub registry: Rc<ModuleRegistry>,
    /// Guest message of the last failed call.
    pub last_error: String,
    /// Integer result of the last successful call.
    pub last_result: i64,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// Install a freshly built registry. Replaces any existing runtime.
pub fn init(registry: ModuleRegistry) {
    let runtime = Runtime {
        registry: Rc::new(registry),
        last_error: String::new(),
        last_result: 0,
    };
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));
}

/// Drop the runtime. Returns false if it was never initialized.
pub fn shutdown() -> bool {
    RUNTIME.with(|slot| slot.borrow_mut().take().is_some())
}

/// Run `f` against the runtime, or return `None` before `init`.
pub fn with<R>(f: impl FnOnce(&mut Runtime) -> R) -> Option<R> {
    RUNTIME.with(|slot| slot.borrow_mut().as_mut().map(f))
}

pub fn registry() -> Option<Rc<ModuleRegistry>> {
    with(|rt| Rc::clone(&rt.registry))
}
