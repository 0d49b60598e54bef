//! WASM entry point for jsffi.
//!
//! The embedding interpreter calls these exports to build the module
//! registry and to call bridged functions by qualified name
//! (`jsffi.console_log`). The host side supplies `console_log` and
//! `host_log` (see [`host`]).

mod host;
mod state;

use std::sync::Arc;

use jsffi_core::{BridgeError, Config, GuestValue, HostFunction, ModuleRegistry};

pub use host::JsConsole;

// ── STATUS CODES ─────────────────────────────────────────────────────

pub const STATUS_OK: i32 = 0;
pub const STATUS_NOT_INITIALIZED: i32 = -1;
pub const STATUS_BAD_INPUT: i32 = -2;
pub const STATUS_INVALID_CONFIG: i32 = -3;
pub const STATUS_REGISTRY: i32 = -4;
/// A guest exception is reported as `STATUS_EXCEPTION_BASE - kind.index()`.
pub const STATUS_EXCEPTION_BASE: i32 = -10;

// ── Helpers: read/write WASM memory ──────────────────────────────────

fn read_bytes<'a>(ptr: *const u8, len: u32) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { std::slice::from_raw_parts(ptr, len as usize) })
}

fn read_str<'a>(ptr: *const u8, len: u32) -> Option<&'a str> {
    read_bytes(ptr, len).and_then(|bytes| std::str::from_utf8(bytes).ok())
}

fn write_to_buffer(bytes: &[u8], out_ptr: *mut u8, max_len: u32) -> u32 {
    let copy_len = bytes.len().min(max_len as usize);
    if copy_len == 0 || out_ptr.is_null() {
        return 0;
    }
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), out_ptr, copy_len);
    }
    copy_len as u32
}

// ── LIFECYCLE EXPORTS ────────────────────────────────────────────────

fn install(config: &Config, host: Arc<dyn HostFunction>) -> i32 {
    if let Err(e) = config.validate() {
        host::log(host::LEVEL_ERROR, &format!("jsffi: {e}"));
        return STATUS_INVALID_CONFIG;
    }
    match config.build_registry(host) {
        Ok(registry) => {
            state::init(registry);
            host::log(
                host::LEVEL_INFO,
                &format!("jsffi: module '{}' registered", config.module.name),
            );
            STATUS_OK
        }
        Err(e) => {
            host::log(host::LEVEL_ERROR, &format!("jsffi: {e}"));
            STATUS_REGISTRY
        }
    }
}

/// Build the module registry from a JSON config (empty input = defaults).
/// Returns 0 on success, negative on error.
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_init(config_ptr: *const u8, config_len: u32) -> i32 {
    let config = if config_len == 0 {
        Config::default()
    } else {
        let Some(json) = read_str(config_ptr, config_len) else {
            return STATUS_BAD_INPUT;
        };
        match Config::from_json(json) {
            Ok(config) => config,
            Err(e) => {
                host::log(host::LEVEL_ERROR, &format!("jsffi: {e}"));
                return STATUS_INVALID_CONFIG;
            }
        }
    };

    install(&config, Arc::new(JsConsole::new(config.host.termination)))
}

/// Tear down the registry. Returns 0, or -1 if nothing was initialized.
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_shutdown() -> i32 {
    if state::shutdown() {
        STATUS_OK
    } else {
        host::log(host::LEVEL_WARN, "jsffi: shutdown before init");
        STATUS_NOT_INITIALIZED
    }
}

// ── MEMORY MANAGEMENT ────────────────────────────────────────────────

/// Allocate memory in WASM linear memory (for the host to write into).
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_alloc(size: u32) -> *mut u8 {
    if size == 0 {
        return std::ptr::NonNull::<u8>::dangling().as_ptr();
    }
    match std::alloc::Layout::from_size_align(size as usize, 1) {
        Ok(layout) => unsafe { std::alloc::alloc(layout) },
        Err(_) => std::ptr::null_mut(),
    }
}

/// Deallocate memory obtained from `jsffi_alloc`.
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_dealloc(ptr: *mut u8, size: u32) {
    if size == 0 || ptr.is_null() {
        return;
    }
    if let Ok(layout) = std::alloc::Layout::from_size_align(size as usize, 1) {
        unsafe { std::alloc::dealloc(ptr, layout) }
    }
}

// ── CALLS ────────────────────────────────────────────────────────────

fn call(name_ptr: *const u8, name_len: u32, arg: Option<GuestValue>) -> i32 {
    let Some(registry) = state::registry() else {
        return STATUS_NOT_INITIALIZED;
    };
    let (Some(name), Some(arg)) = (read_str(name_ptr, name_len), arg) else {
        return STATUS_BAD_INPUT;
    };
    call_with(&registry, name, arg)
}

fn call_with(registry: &ModuleRegistry, name: &str, arg: GuestValue) -> i32 {
    // The state borrow is released here; the host may call back in.
    let outcome = registry.call(name, std::slice::from_ref(&arg));

    state::with(|rt| match outcome {
        Ok(result) => {
            rt.last_result = result.as_int().unwrap_or(0);
            rt.last_error.clear();
            STATUS_OK
        }
        Err(err) => {
            rt.last_error = err.to_guest_message();
            exception_status(&err)
        }
    })
    .unwrap_or(STATUS_NOT_INITIALIZED)
}

fn exception_status(err: &BridgeError) -> i32 {
    STATUS_EXCEPTION_BASE - err.exception_kind().index()
}

/// Call `name` with a `str` argument. Returns 0 and stores the result for
/// `jsffi_last_result`, or a negative status.
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_call_str(
    name_ptr: *const u8,
    name_len: u32,
    arg_ptr: *const u8,
    arg_len: u32,
) -> i32 {
    let arg = read_str(arg_ptr, arg_len).map(GuestValue::str);
    call(name_ptr, name_len, arg)
}

/// Call `name` with a `bytes` argument.
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_call_bytes(
    name_ptr: *const u8,
    name_len: u32,
    arg_ptr: *const u8,
    arg_len: u32,
) -> i32 {
    let arg = read_bytes(arg_ptr, arg_len).map(GuestValue::bytes);
    call(name_ptr, name_len, arg)
}

/// Call `name` with an `int` argument.
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_call_int(name_ptr: *const u8, name_len: u32, value: i64) -> i32 {
    call(name_ptr, name_len, Some(GuestValue::Int(value)))
}

/// Integer result of the last successful call.
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_last_result() -> i64 {
    state::with(|rt| rt.last_result).unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn jsffi_last_error_len() -> u32 {
    state::with(|rt| rt.last_error.len() as u32).unwrap_or(0)
}

/// Copy the last error message (`Kind: message`) into `out_ptr`.
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_last_error(out_ptr: *mut u8, max_len: u32) -> u32 {
    state::with(|rt| write_to_buffer(rt.last_error.as_bytes(), out_ptr, max_len)).unwrap_or(0)
}

// ── INTROSPECTION ────────────────────────────────────────────────────

fn describe(registry: &ModuleRegistry) -> String {
    let modules: Vec<serde_json::Value> = registry
        .modules()
        .map(|module| {
            let attrs: Vec<serde_json::Value> = module
                .attrs()
                .map(|(name, export)| {
                    serde_json::json!({ "name": name, "type": export.type_name() })
                })
                .collect();
            serde_json::json!({ "name": module.name(), "attrs": attrs })
        })
        .collect();
    serde_json::json!({ "modules": modules }).to_string()
}

/// Copy a JSON description of the registry into `out_ptr`.
/// Returns the number of bytes written (0 before init).
#[unsafe(no_mangle)]
pub extern "C" fn jsffi_describe(out_ptr: *mut u8, max_len: u32) -> u32 {
    match state::registry() {
        Some(registry) => write_to_buffer(describe(&registry).as_bytes(), out_ptr, max_len),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsffi_core::host::{HostFault, RecordingHost};
    use jsffi_core::{ExceptionKind, FaultPolicy};

    fn call_str(name: &str, arg: &str) -> i32 {
        jsffi_call_str(name.as_ptr(), name.len() as u32, arg.as_ptr(), arg.len() as u32)
    }

    fn last_error() -> String {
        let mut buf = vec![0u8; jsffi_last_error_len() as usize];
        let n = jsffi_last_error(buf.as_mut_ptr(), buf.len() as u32);
        buf.truncate(n as usize);
        String::from_utf8(buf).unwrap()
    }

    fn init_recording(config: &Config) -> Arc<RecordingHost> {
        let host = Arc::new(RecordingHost::new());
        assert_eq!(install(config, host.clone()), STATUS_OK);
        host
    }

    #[test]
    fn test_call_before_init() {
        assert_eq!(call_str("jsffi.console_log", "x"), STATUS_NOT_INITIALIZED);
        assert_eq!(jsffi_shutdown(), STATUS_NOT_INITIALIZED);
        assert_eq!(jsffi_describe(std::ptr::null_mut(), 0), 0);
    }

    #[test]
    fn test_init_with_defaults_and_json() {
        assert_eq!(jsffi_init(std::ptr::null(), 0), STATUS_OK);
        assert_eq!(call_str("jsffi.console_log", "hello"), STATUS_OK);
        assert_eq!(jsffi_last_result(), 0);

        let json = r#"{ "module": { "name": "js" } }"#;
        assert_eq!(jsffi_init(json.as_ptr(), json.len() as u32), STATUS_OK);
        assert_eq!(call_str("js.console_log", "hello"), STATUS_OK);
        assert_eq!(jsffi_shutdown(), STATUS_OK);
    }

    #[test]
    fn test_init_rejects_bad_config() {
        let json = "{ not json";
        assert_eq!(jsffi_init(json.as_ptr(), json.len() as u32), STATUS_INVALID_CONFIG);

        let json = r#"{ "module": { "name": "1bad" } }"#;
        assert_eq!(jsffi_init(json.as_ptr(), json.len() as u32), STATUS_INVALID_CONFIG);

        let bad_utf8 = [0xffu8, 0xfe];
        assert_eq!(jsffi_init(bad_utf8.as_ptr(), 2), STATUS_BAD_INPUT);
    }

    #[test]
    fn test_host_observes_exact_bytes() {
        let host = init_recording(&Config::default());
        assert_eq!(call_str("jsffi.console_log", "hello"), STATUS_OK);

        let raw = [0x00u8, 0xff, 0x10];
        let name = "jsffi.console_log";
        assert_eq!(
            jsffi_call_bytes(name.as_ptr(), name.len() as u32, raw.as_ptr(), raw.len() as u32),
            STATUS_OK
        );
        assert_eq!(host.observed(), vec![b"hello".to_vec(), raw.to_vec()]);
    }

    #[test]
    fn test_int_argument_raises_type_error() {
        let host = init_recording(&Config::default());
        let name = "jsffi.console_log";
        let status = jsffi_call_int(name.as_ptr(), name.len() as u32, 42);
        assert_eq!(status, STATUS_EXCEPTION_BASE - ExceptionKind::TypeError.index());
        assert_eq!(
            last_error(),
            "TypeError: console_log() argument must be str, bytes or a buffer, not 'int'"
        );
        assert_eq!(host.call_count(), 0);
    }

    #[test]
    fn test_unknown_names() {
        init_recording(&Config::default());
        assert_eq!(
            call_str("os.console_log", "x"),
            STATUS_EXCEPTION_BASE - ExceptionKind::ImportError.index()
        );
        assert_eq!(
            call_str("jsffi.alert", "x"),
            STATUS_EXCEPTION_BASE - ExceptionKind::AttributeError.index()
        );
        let bad_utf8 = [0xffu8];
        assert_eq!(
            jsffi_call_str(bad_utf8.as_ptr(), 1, "x".as_ptr(), 1),
            STATUS_BAD_INPUT
        );
    }

    #[test]
    fn test_return_code_policy_surfaces_fault_code() {
        let mut config = Config::default();
        config.host.fault_policy = FaultPolicy::ReturnCode;
        let host = Arc::new(RecordingHost::new().failing(HostFault::new(9, "closed")));
        assert_eq!(install(&config, host), STATUS_OK);

        assert_eq!(call_str("jsffi.console_log", "x"), STATUS_OK);
        assert_eq!(jsffi_last_result(), 9);
    }

    #[test]
    fn test_raise_policy_reports_os_error() {
        let host = Arc::new(RecordingHost::new().failing(HostFault::new(9, "closed")));
        assert_eq!(install(&Config::default(), host), STATUS_OK);

        assert_eq!(
            call_str("jsffi.console_log", "x"),
            STATUS_EXCEPTION_BASE - ExceptionKind::OSError.index()
        );
        assert_eq!(last_error(), "OSError: host call failed: closed (code 9)");
    }

    #[test]
    fn test_describe_lists_module_table() {
        init_recording(&Config::default());
        let mut buf = vec![0u8; 512];
        let n = jsffi_describe(buf.as_mut_ptr(), buf.len() as u32);
        let parsed: serde_json::Value = serde_json::from_slice(&buf[..n as usize]).unwrap();
        assert_eq!(parsed["modules"][0]["name"], "jsffi");
        assert_eq!(parsed["modules"][0]["attrs"][0]["name"], "__name__");
        assert_eq!(parsed["modules"][0]["attrs"][1]["name"], "console_log");
        assert_eq!(parsed["modules"][0]["attrs"][1]["type"], "function");
    }

    #[test]
    fn test_alloc_roundtrip() {
        let ptr = jsffi_alloc(16);
        assert!(!ptr.is_null());
        jsffi_dealloc(ptr, 16);

        let empty = jsffi_alloc(0);
        assert!(!empty.is_null());
        jsffi_dealloc(empty, 0);
    }
}
