use serde::{Deserialize, Serialize};

use crate::host::HostFault;

/// Errors raised at the guest/host boundary.
///
/// Every variant maps onto a guest exception class via
/// [`BridgeError::exception_kind`], so the guest runtime can surface it as a
/// catchable error at the call site.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("{function}() argument must be {expected}, not '{found}'")]
    InvalidArgumentType {
        function: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{function}() takes {expected} positional arguments but {given} were given")]
    ArityMismatch {
        function: String,
        expected: usize,
        given: usize,
    },
    #[error("embedded null byte at position {position}")]
    InteriorNul { position: usize },
    #[error("host call failed: {0}")]
    HostCallFault(#[from] HostFault),
    #[error("no module named '{0}'")]
    ModuleNotFound(String),
    #[error("module '{module}' has no attribute '{attr}'")]
    AttributeNotFound { module: String, attr: String },
    #[error("name '{0}' is not defined")]
    NameNotFound(String),
    #[error("'{0}' object is not callable")]
    NotCallable(&'static str),
}

impl BridgeError {
    /// The guest exception class this error is raised as.
    pub fn exception_kind(&self) -> ExceptionKind {
        match self {
            BridgeError::InvalidArgumentType { .. }
            | BridgeError::ArityMismatch { .. }
            | BridgeError::NotCallable(_) => ExceptionKind::TypeError,
            BridgeError::InteriorNul { .. } => ExceptionKind::ValueError,
            BridgeError::HostCallFault(_) => ExceptionKind::OSError,
            BridgeError::ModuleNotFound(_) => ExceptionKind::ImportError,
            BridgeError::AttributeNotFound { .. } => ExceptionKind::AttributeError,
            BridgeError::NameNotFound(_) => ExceptionKind::NameError,
        }
    }

    /// Render as the guest runtime would print an uncaught exception.
    pub fn to_guest_message(&self) -> String {
        format!("{}: {}", self.exception_kind().name(), self)
    }
}

/// Guest exception classes the bridge can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    TypeError,
    ValueError,
    OSError,
    ImportError,
    AttributeError,
    NameError,
}

impl ExceptionKind {
    pub const ALL: [ExceptionKind; 6] = [
        ExceptionKind::TypeError,
        ExceptionKind::ValueError,
        ExceptionKind::OSError,
        ExceptionKind::ImportError,
        ExceptionKind::AttributeError,
        ExceptionKind::NameError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::OSError => "OSError",
            ExceptionKind::ImportError => "ImportError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::NameError => "NameError",
        }
    }

    /// Stable index used by the wasm ABI status codes.
    pub fn index(&self) -> i32 {
        match self {
            ExceptionKind::TypeError => 0,
            ExceptionKind::ValueError => 1,
            ExceptionKind::OSError => 2,
            ExceptionKind::ImportError => 3,
            ExceptionKind::AttributeError => 4,
            ExceptionKind::NameError => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message() {
        let err = BridgeError::InvalidArgumentType {
            function: "console_log".to_string(),
            expected: "str, bytes or a buffer",
            found: "int",
        };
        assert_eq!(
            err.to_string(),
            "console_log() argument must be str, bytes or a buffer, not 'int'"
        );
        assert_eq!(err.exception_kind(), ExceptionKind::TypeError);
    }

    #[test]
    fn test_exception_mapping() {
        let fault = HostFault::new(5, "sink closed");
        assert_eq!(
            BridgeError::HostCallFault(fault).exception_kind(),
            ExceptionKind::OSError
        );
        assert_eq!(
            BridgeError::InteriorNul { position: 3 }.exception_kind(),
            ExceptionKind::ValueError
        );
        assert_eq!(
            BridgeError::ModuleNotFound("os".into()).exception_kind(),
            ExceptionKind::ImportError
        );
        assert_eq!(
            BridgeError::NameNotFound("jsffi".into()).to_guest_message(),
            "NameError: name 'jsffi' is not defined"
        );
    }

    #[test]
    fn test_exception_indices_are_distinct() {
        let mut indices: Vec<i32> = ExceptionKind::ALL.iter().map(|k| k.index()).collect();
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), ExceptionKind::ALL.len());
    }
}
