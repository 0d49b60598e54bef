use std::io::Write;
use std::sync::Mutex;

use crate::view::{BufferView, Termination};

/// Failure reported by a host function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct HostFault {
    pub code: i32,
    pub message: String,
}

impl HostFault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HostFault {
    fn from(err: std::io::Error) -> Self {
        let code = err.raw_os_error().filter(|c| *c != 0).unwrap_or(-1);
        Self::new(code, err.to_string())
    }
}

/// A function implemented by the host environment.
///
/// The host owns the implementation; the bridge only holds a shared handle
/// and calls it with a view that is valid for the duration of the call.
pub trait HostFunction: Send + Sync {
    fn name(&self) -> &str;

    /// Buffer convention the host expects.
    fn termination(&self) -> Termination {
        Termination::LengthDelimited
    }

    fn call(&self, view: &BufferView<'_>) -> Result<(), HostFault>;
}

/// Console that forwards every line to `tracing` on target `jsffi::console`.
#[derive(Debug, Default, Clone)]
pub struct TracingConsole {
    termination: Termination,
}

impl TracingConsole {
    pub fn new(termination: Termination) -> Self {
        Self { termination }
    }
}

impl HostFunction for TracingConsole {
    fn name(&self) -> &str {
        "console_log"
    }

    fn termination(&self) -> Termination {
        self.termination
    }

    fn call(&self, view: &BufferView<'_>) -> Result<(), HostFault> {
        tracing::info!(target: "jsffi::console", "{}", String::from_utf8_lossy(view.as_bytes()));
        Ok(())
    }
}

/// Console that writes each buffer followed by a newline to a writer.
pub struct WriterConsole<W> {
    writer: Mutex<W>,
    termination: Termination,
}

impl<W: Write + Send> WriterConsole<W> {
    pub fn new(writer: W, termination: Termination) -> Self {
        Self {
            writer: Mutex::new(writer),
            termination,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> HostFunction for WriterConsole<W> {
    fn name(&self) -> &str {
        "console_log"
    }

    fn termination(&self) -> Termination {
        self.termination
    }

    fn call(&self, view: &BufferView<'_>) -> Result<(), HostFault> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| HostFault::new(-1, "console writer poisoned"))?;
        writer.write_all(view.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// A host function for tests: records every buffer it observes.
///
/// Optionally primed to fail every call with a fixed fault.
#[derive(Debug, Default)]
pub struct RecordingHost {
    termination: Termination,
    fault: Option<HostFault>,
    observed: Mutex<Vec<Vec<u8>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn failing(mut self, fault: HostFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Bytes seen by each call so far, in call order.
    pub fn observed(&self) -> Vec<Vec<u8>> {
        self.observed
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.observed.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl HostFunction for RecordingHost {
    fn name(&self) -> &str {
        "console_log"
    }

    fn termination(&self) -> Termination {
        self.termination
    }

    fn call(&self, view: &BufferView<'_>) -> Result<(), HostFault> {
        if let Some(c_str) = view.as_c_str() {
            // The host reads up to the terminator, not up to `len`.
            debug_assert_eq!(c_str.to_bytes().len(), view.len());
        }
        if let Ok(mut calls) = self.observed.lock() {
            calls.push(view.as_bytes().to_vec());
        }
        match &self.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::GuestStr;
    use crate::view::ByteView;

    #[test]
    fn test_writer_console_appends_newline() {
        let console = WriterConsole::new(Vec::new(), Termination::LengthDelimited);
        let s = GuestStr::new("hello");
        let view = s.byte_view(console.termination()).unwrap();
        console.call(&view).unwrap();
        console.call(&view).unwrap();
        assert_eq!(console.into_inner(), b"hello\nhello\n");
    }

    #[test]
    fn test_writer_console_io_error_becomes_fault() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let console = WriterConsole::new(Broken, Termination::LengthDelimited);
        let s = GuestStr::new("x");
        let view = s.byte_view(Termination::LengthDelimited).unwrap();
        let fault = console.call(&view).unwrap_err();
        assert_eq!(fault.code, -1);
        assert!(fault.message.contains("pipe closed"));
    }

    #[test]
    fn test_recording_host_records_and_fails() {
        let host = RecordingHost::new().failing(HostFault::new(7, "sink unavailable"));
        let s = GuestStr::new("abc");
        let view = s.byte_view(host.termination()).unwrap();
        let fault = host.call(&view).unwrap_err();
        assert_eq!(fault, HostFault::new(7, "sink unavailable"));
        assert_eq!(host.observed(), vec![b"abc".to_vec()]);
        assert_eq!(host.call_count(), 1);
    }

    #[test]
    fn test_tracing_console_accepts_invalid_utf8() {
        let console = TracingConsole::default();
        let data = vec![0xff, 0xfe];
        let view = data.byte_view(console.termination()).unwrap();
        assert!(console.call(&view).is_ok());
    }

    #[test]
    fn test_host_fault_display() {
        assert_eq!(HostFault::new(3, "gone").to_string(), "gone (code 3)");
    }
}
