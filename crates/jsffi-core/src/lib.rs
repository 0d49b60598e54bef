//! jsffi-core: the guest/host call boundary.
//!
//! Guest values expose their bytes through the [`view::ByteView`]
//! capability, a [`bridge::Bridge`] hands a scoped [`view::BufferView`] to a
//! [`host::HostFunction`], and the [`module::ModuleRegistry`] makes bridged
//! functions importable by guest code.

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod module;
pub mod session;
pub mod value;
pub mod view;

pub use bridge::{Bridge, FaultPolicy};
pub use config::{Config, ConfigError};
pub use error::{BridgeError, ExceptionKind};
pub use host::{HostFault, HostFunction};
pub use module::{Export, Module, ModuleRegistry, NativeFunction, RegistryBuilder};
pub use session::Session;
pub use value::{ChunkedBytes, GuestStr, GuestValue};
pub use view::{BufferView, ByteView, Provenance, Termination};
