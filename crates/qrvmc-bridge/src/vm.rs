//! Owned VM instances.
//!
//! A [`VmInstance`] wraps the native `qrvmc_vm*` returned by the connector
//! binding. The raw pointer never leaves this module. Every operation takes
//! the instance lock, so calls from different threads are serialized while
//! host callbacks running on the executing thread may re-enter.

use std::cell::Cell;
use std::ffi::{CStr, CString, c_char};
use std::fmt;
use std::panic;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::ffi;
use crate::host::{HOST_INTERFACE, HostContext, HostSlot};
use crate::linker::ConnectorModule;
use crate::message::ExecutionMessage;
use crate::result::ExecutionResult;
use crate::types::{Revision, SetOptionResult};

/// ABI version implemented by this bridge.
pub const ABI_VERSION: i32 = ffi::QRVMC_ABI_VERSION;

/// Lifecycle state visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Live,
    Destroyed,
}

struct VmSlot {
    vm: Cell<Option<NonNull<ffi::qrvmc_vm>>>,
    /// Executions in flight on the owning thread (nested calls stack up).
    executing: Cell<usize>,
}

// The native instance is only touched while the instance lock is held.
unsafe impl Send for VmSlot {}

/// Marks an execution as in flight for the lifetime of the guard.
struct InFlight<'a> {
    counter: &'a Cell<usize>,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a Cell<usize>) -> Self {
        counter.set(counter.get() + 1);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.set(self.counter.get() - 1);
    }
}

/// A live native VM, destroyed exactly once.
///
/// Destruction happens either through [`destroy`](Self::destroy) or when the
/// instance is dropped. After `destroy` every operation fails with
/// [`Error::Usage`].
pub struct VmInstance {
    inner: ReentrantMutex<VmSlot>,
    selector: String,
    // Keeps the binding that created the VM alive.
    _connector: Arc<ConnectorModule>,
}

impl fmt::Debug for VmInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmInstance")
            .field("selector", &self.selector)
            .field("state", &self.state())
            .finish()
    }
}

impl VmInstance {
    pub(crate) fn create(connector: Arc<ConnectorModule>, selector: &str) -> Result<Self> {
        let vm = connector.load_and_create(selector)?;
        tracing::info!("Created VM instance for '{}'", selector);

        Ok(Self {
            inner: ReentrantMutex::new(VmSlot {
                vm: Cell::new(Some(vm)),
                executing: Cell::new(0),
            }),
            selector: selector.to_string(),
            _connector: connector,
        })
    }

    /// The selector this instance was created with.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn state(&self) -> VmState {
        match self.inner.lock().vm.get() {
            Some(_) => VmState::Live,
            None => VmState::Destroyed,
        }
    }

    fn live(&self) -> Result<(ReentrantMutexGuard<'_, VmSlot>, NonNull<ffi::qrvmc_vm>)> {
        let slot = self.inner.lock();
        match slot.vm.get() {
            Some(vm) => Ok((slot, vm)),
            None => Err(Error::Usage(format!(
                "VM instance '{}' has been destroyed",
                self.selector
            ))),
        }
    }

    /// ABI version the native module implements. No policy is applied here.
    pub fn abi_version(&self) -> Result<i32> {
        let (_slot, vm) = self.live()?;
        Ok(unsafe { vm.as_ref() }.abi_version)
    }

    /// Whether the module implements the same ABI version as this bridge.
    pub fn is_abi_compatible(&self) -> Result<bool> {
        Ok(self.abi_version()? == ABI_VERSION)
    }

    pub fn name(&self) -> Result<String> {
        let (_slot, vm) = self.live()?;
        read_text(unsafe { vm.as_ref() }.name, "name")
    }

    pub fn version(&self) -> Result<String> {
        let (_slot, vm) = self.live()?;
        read_text(unsafe { vm.as_ref() }.version, "version")
    }

    /// Current capabilities. May change after [`set_option`](Self::set_option).
    pub fn capabilities(&self) -> Result<Capabilities> {
        let (_slot, vm) = self.live()?;
        let get_capabilities = unsafe { vm.as_ref() }
            .get_capabilities
            .ok_or_else(|| Error::ProtocolViolation("VM has no get_capabilities function".into()))?;

        let bits = unsafe { get_capabilities(vm.as_ptr()) };
        Ok(Capabilities::from_bits(bits))
    }

    pub fn has_capability(&self, capability: Capabilities) -> Result<bool> {
        Ok(self.capabilities()?.contains(capability))
    }

    /// Whether the module accepts options at all.
    pub fn supports_options(&self) -> Result<bool> {
        let (_slot, vm) = self.live()?;
        Ok(unsafe { vm.as_ref() }.set_option.is_some())
    }

    /// Forward an option to the module.
    ///
    /// A module without option support answers `InvalidName`; the outcome is
    /// returned as is.
    pub fn set_option(&self, name: &str, value: &str) -> Result<SetOptionResult> {
        let c_name = CString::new(name)
            .map_err(|_| Error::Usage(format!("option name contains a NUL byte: {:?}", name)))?;
        let c_value = CString::new(value)
            .map_err(|_| Error::Usage(format!("option value contains a NUL byte: {:?}", value)))?;

        let (_slot, vm) = self.live()?;
        let Some(set_option) = unsafe { vm.as_ref() }.set_option else {
            return Ok(SetOptionResult::InvalidName);
        };

        let raw = unsafe { set_option(vm.as_ptr(), c_name.as_ptr(), c_value.as_ptr()) };
        let result = SetOptionResult::from(raw);
        tracing::debug!("set_option({}={}) on '{}': {:?}", name, value, self.selector, result);
        Ok(result)
    }

    /// Run `code` with `message` against this VM.
    ///
    /// Executions on one instance never overlap across threads. The VM may
    /// call back into `host` any number of times before returning, and those
    /// callbacks may execute again on this instance from the same thread.
    ///
    /// A panic in `host` is held back until the VM has returned and its
    /// result has been released, then resumed in the caller. The instance
    /// stays live.
    pub fn execute(
        &self,
        host: &mut dyn HostContext,
        revision: Revision,
        message: &ExecutionMessage,
        code: &[u8],
    ) -> Result<ExecutionResult> {
        let (slot, vm) = self.live()?;
        let execute = unsafe { vm.as_ref() }
            .execute
            .ok_or_else(|| Error::ProtocolViolation("VM has no execute function".into()))?;

        let _in_flight = InFlight::enter(&slot.executing);
        let raw_message = message.as_ffi();
        let code_ptr = if code.is_empty() {
            ptr::null()
        } else {
            code.as_ptr()
        };
        let mut host_slot = HostSlot::new(host);

        let raw = unsafe {
            execute(
                vm.as_ptr(),
                &HOST_INTERFACE,
                host_slot.as_context(),
                revision.as_raw(),
                &raw_message,
                code_ptr,
                code.len(),
            )
        };

        let result = unsafe { ExecutionResult::from_native(raw) };
        if let Some(payload) = host_slot.take_panic() {
            drop(result);
            panic::resume_unwind(payload);
        }
        Ok(result)
    }

    /// Destroy the native VM.
    ///
    /// Fails when the instance is already destroyed or when called from a
    /// host callback of an execution still running on this instance.
    pub fn destroy(&self) -> Result<()> {
        let slot = self.inner.lock();
        if slot.executing.get() > 0 {
            return Err(Error::Usage(format!(
                "cannot destroy VM instance '{}' during an execution",
                self.selector
            )));
        }
        let vm = slot.vm.take().ok_or_else(|| {
            Error::Usage(format!("VM instance '{}' already destroyed", self.selector))
        })?;

        unsafe { destroy_raw(vm) };
        tracing::debug!("Destroyed VM instance '{}'", self.selector);
        Ok(())
    }
}

impl Drop for VmInstance {
    fn drop(&mut self) {
        if let Some(vm) = self.inner.get_mut().vm.take() {
            unsafe { destroy_raw(vm) };
            tracing::debug!("Destroyed VM instance '{}' on drop", self.selector);
        }
    }
}

/// Call the module's destroy function.
///
/// # Safety
/// `vm` must be a live instance returned by the binding and must not be
/// used afterwards.
pub(crate) unsafe fn destroy_raw(vm: NonNull<ffi::qrvmc_vm>) {
    if let Some(destroy) = unsafe { vm.as_ref() }.destroy {
        unsafe { destroy(vm.as_ptr()) };
    } else {
        tracing::warn!("VM has no destroy function; instance leaked");
    }
}

fn read_text(text: *const c_char, what: &str) -> Result<String> {
    if text.is_null() {
        return Err(Error::ProtocolViolation(format!("VM {} is null", what)));
    }
    let text = unsafe { CStr::from_ptr(text) }
        .to_str()
        .map_err(|_| Error::ProtocolViolation(format!("VM {} is not valid UTF-8", what)))?;
    if text.is_empty() {
        return Err(Error::ProtocolViolation(format!("VM {} is empty", what)));
    }
    Ok(text.to_string())
}
