//! Loader and execution bridge for QRVMC virtual machine modules.
//!
//! This crate provides:
//! - Platform-aware resolution of the connector binding (system load, then
//!   extraction of a bundled copy)
//! - Owned VM instances with exactly-once destruction
//! - ABI and capability introspection
//! - Serialized execution with re-entrant host callbacks
//! - Option forwarding and `<selector>,<name>=<value>` configuration strings
//!
//! ```ignore
//! use qrvmc_bridge::{ExecutionMessage, HostContext, LibraryResolver, Revision};
//!
//! struct World;
//! impl HostContext for World {}
//!
//! let vm = LibraryResolver::global().create_configured("./libvm.so,trace")?;
//! let message = ExecutionMessage::call(sender, recipient, 100_000);
//! let result = vm.execute(&mut World, Revision::default(), &message, &code)?;
//! vm.destroy()?;
//! ```

pub mod capabilities;
pub mod config;
pub mod error;
pub mod extract;
pub mod ffi;
pub mod host;
pub mod linker;
pub mod message;
pub mod options;
pub mod platform;
pub mod resolver;
pub mod resource;
pub mod result;
pub mod types;
pub mod vm;

pub use capabilities::Capabilities;
pub use config::ResolverConfig;
pub use error::{Error, LinkError, ResolutionError, Result};
pub use host::HostContext;
pub use linker::{ConnectorEntryPoints, ConnectorModule, DynamicLinker, Linker, ModuleOrigin};
pub use message::ExecutionMessage;
pub use options::{MAX_CONFIG_LENGTH, VmConfiguration};
pub use platform::LibraryExtension;
pub use resolver::{LibraryResolver, LoadOutcome};
pub use resource::{EmbeddedResources, ResourceDir, ResourceSource};
pub use result::ExecutionResult;
pub use types::{
    AccessStatus, Address, Bytes32, CallKind, LoaderErrorCode, Revision, SetOptionResult,
    StatusCode, StorageStatus, TxContext, Uint256,
};
pub use vm::{ABI_VERSION, VmInstance, VmState};
