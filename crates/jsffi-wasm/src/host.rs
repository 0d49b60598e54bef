//! Host imports: functions the JS side provides to the WASM module.
//!
//! On wasm32 targets these are real `extern "C"` imports from the `env`
//! module. On native targets (for testing) they are no-op stubs.

use jsffi_core::{BufferView, HostFault, HostFunction, Termination};

#[cfg(target_arch = "wasm32")]
mod ffi {
    #[link(wasm_import_module = "env")]
    unsafe extern "C" {
        pub fn console_log(msg_ptr: *const u8, msg_len: u32);
        pub fn console_log_cstr(msg_ptr: *const u8);
        pub fn host_log(level: i32, msg_ptr: *const u8, msg_len: u32);
    }
}

pub const LEVEL_ERROR: i32 = 0;
pub const LEVEL_WARN: i32 = 1;
pub const LEVEL_INFO: i32 = 2;

/// Safe wrapper: emit a diagnostic line through the host's logger.
pub fn log(level: i32, msg: &str) {
    #[cfg(target_arch = "wasm32")]
    unsafe {
        ffi::host_log(level, msg.as_ptr(), msg.len() as u32);
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (level, msg);
    }
}

/// `console.log` in the JS host.
///
/// `LengthDelimited` calls `console_log(ptr, len)`; `NulTerminated` calls
/// `console_log_cstr(ptr)`, which decodes up to the terminator.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsConsole {
    termination: Termination,
}

impl JsConsole {
    pub fn new(termination: Termination) -> Self {
        Self { termination }
    }
}

impl HostFunction for JsConsole {
    fn name(&self) -> &str {
        "console_log"
    }

    fn termination(&self) -> Termination {
        self.termination
    }

    fn call(&self, view: &BufferView<'_>) -> Result<(), HostFault> {
        let len = u32::try_from(view.len())
            .map_err(|_| HostFault::new(-1, "buffer exceeds wasm32 address space"))?;

        #[cfg(target_arch = "wasm32")]
        unsafe {
            match view.termination() {
                Termination::LengthDelimited => ffi::console_log(view.as_ptr(), len),
                Termination::NulTerminated => ffi::console_log_cstr(view.as_ptr()),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = len;
        }
        Ok(())
    }
}
