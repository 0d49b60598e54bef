use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::host::{HostFault, HostFunction};
use crate::module::NativeFunction;
use crate::value::GuestValue;
use crate::view::with_view;

/// What the guest sees when the host function itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Raise `OSError` in the guest.
    #[default]
    Raise,
    /// Return the host's (non-zero) fault code as the call result.
    ReturnCode,
    /// Log the fault and report success.
    Ignore,
}

const EXPECTED_BUFFER: &str = "str, bytes or a buffer";

/// Guest-callable adapter around one host function.
///
/// Holds no mutable state: every call is independent.
pub struct Bridge {
    name: String,
    host: Arc<dyn HostFunction>,
    policy: FaultPolicy,
}

impl Bridge {
    pub fn new(host: Arc<dyn HostFunction>, policy: FaultPolicy) -> Self {
        Self {
            name: host.name().to_string(),
            host,
            policy,
        }
    }

    /// Export under a different guest-visible name than the host's.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn policy(&self) -> FaultPolicy {
        self.policy
    }

    /// Marshal `value` into a buffer view and hand it to the host.
    ///
    /// Returns `Int(0)` on success. Values without a buffer view fail with
    /// [`BridgeError::InvalidArgumentType`] before the host is touched.
    pub fn invoke(&self, value: &GuestValue) -> Result<GuestValue, BridgeError> {
        let source = value
            .as_byte_view()
            .ok_or_else(|| BridgeError::InvalidArgumentType {
                function: self.name.clone(),
                expected: EXPECTED_BUFFER,
                found: value.type_name(),
            })?;

        let outcome = with_view(source, self.host.termination(), |view| {
            debug!(
                function = %self.name,
                len = view.len(),
                provenance = ?view.provenance(),
                "calling host"
            );
            self.host.call(view)
        })?;

        match outcome {
            Ok(()) => Ok(GuestValue::Int(0)),
            Err(fault) => self.on_fault(fault),
        }
    }

    fn on_fault(&self, fault: HostFault) -> Result<GuestValue, BridgeError> {
        match self.policy {
            FaultPolicy::Raise => Err(BridgeError::HostCallFault(fault)),
            FaultPolicy::ReturnCode => {
                warn!(function = %self.name, %fault, "host call failed, returning code");
                let code = if fault.code == 0 { -1 } else { fault.code };
                Ok(GuestValue::Int(i64::from(code)))
            }
            FaultPolicy::Ignore => {
                warn!(function = %self.name, %fault, "host call failed, ignoring");
                Ok(GuestValue::Int(0))
            }
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("name", &self.name)
            .field("host", &self.host.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl NativeFunction for Bridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        1
    }

    fn call(&self, args: &[GuestValue]) -> Result<GuestValue, BridgeError> {
        match args {
            [value] => self.invoke(value),
            _ => Err(BridgeError::ArityMismatch {
                function: self.name.clone(),
                expected: 1,
                given: args.len(),
            }),
        }
    }
}
