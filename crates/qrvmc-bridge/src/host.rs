//! Host context: the callbacks a VM invokes while executing.
//!
//! The bridge never interprets these calls. During [`VmInstance::execute`]
//! the caller's `&mut dyn HostContext` is parked in a stack slot, the slot's
//! address travels through the native `qrvmc_host_context*`, and the static
//! trampolines below turn it back into the trait object.
//!
//! ```text
//! VmInstance::execute(host)
//!     │
//!     └── native execute(vm, &HOST_INTERFACE, &mut slot, ...)
//!             │
//!             └── HOST_INTERFACE.get_storage(&mut slot, ...)
//!                     │
//!                     └── slot.get_storage(...)   (Rust, same thread)
//! ```
//!
//! Callbacks run synchronously on the executing thread and may re-enter the
//! bridge, for example a `call` that executes a nested message.
//!
//! [`VmInstance::execute`]: crate::VmInstance::execute

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::ffi;
use crate::message::ExecutionMessage;
use crate::result::ExecutionResult;
use crate::types::{AccessStatus, Address, Bytes32, StorageStatus, TxContext, Uint256};

/// State and services a VM can reach during execution.
///
/// Default implementations behave like an empty world: no accounts, zero
/// storage, cold accesses, failing sub-calls.
pub trait HostContext {
    fn account_exists(&self, _address: &Address) -> bool {
        false
    }

    fn get_storage(&self, _address: &Address, _key: &Bytes32) -> Bytes32 {
        Bytes32::default()
    }

    fn set_storage(
        &mut self,
        _address: &Address,
        _key: &Bytes32,
        _value: &Bytes32,
    ) -> StorageStatus {
        StorageStatus::Assigned
    }

    fn get_balance(&self, _address: &Address) -> Uint256 {
        Uint256::default()
    }

    fn get_code_size(&self, _address: &Address) -> usize {
        0
    }

    fn get_code_hash(&self, _address: &Address) -> Bytes32 {
        Bytes32::default()
    }

    /// Copy code of `address` starting at `code_offset` into `buffer`.
    /// Returns the number of bytes copied.
    fn copy_code(&self, _address: &Address, _code_offset: usize, _buffer: &mut [u8]) -> usize {
        0
    }

    fn call(&mut self, _message: &ExecutionMessage) -> ExecutionResult {
        ExecutionResult::failure()
    }

    fn get_tx_context(&self) -> TxContext {
        TxContext::default()
    }

    fn get_block_hash(&self, _number: i64) -> Bytes32 {
        Bytes32::default()
    }

    fn emit_log(&mut self, _address: &Address, _data: &[u8], _topics: &[Bytes32]) {}

    fn access_account(&mut self, _address: &Address) -> AccessStatus {
        AccessStatus::Cold
    }

    fn access_storage(&mut self, _address: &Address, _key: &Bytes32) -> AccessStatus {
        AccessStatus::Cold
    }
}

/// Stack slot whose address is passed to the VM as the host context.
///
/// A panic raised by the host is caught at the trampoline and parked here.
/// Later callbacks of the same execution answer from an empty world.
pub(crate) struct HostSlot<'a> {
    host: &'a mut dyn HostContext,
    panic: Option<Box<dyn Any + Send>>,
}

impl<'a> HostSlot<'a> {
    pub(crate) fn new(host: &'a mut dyn HostContext) -> Self {
        Self { host, panic: None }
    }

    /// The pointer handed to the VM. Valid as long as the slot is not moved or dropped.
    pub(crate) fn as_context(&mut self) -> *mut ffi::qrvmc_host_context {
        self as *mut HostSlot<'a> as *mut ffi::qrvmc_host_context
    }

    /// Payload of the first host panic, if any.
    pub(crate) fn take_panic(&mut self) -> Option<Box<dyn Any + Send>> {
        self.panic.take()
    }
}

/// Answers callbacks after the host has panicked.
struct Unwound;

impl HostContext for Unwound {}

/// Callback table installed for every execution.
pub(crate) static HOST_INTERFACE: ffi::qrvmc_host_interface = ffi::qrvmc_host_interface {
    account_exists: Some(account_exists),
    get_storage: Some(get_storage),
    set_storage: Some(set_storage),
    get_balance: Some(get_balance),
    get_code_size: Some(get_code_size),
    get_code_hash: Some(get_code_hash),
    copy_code: Some(copy_code),
    call: Some(call),
    get_tx_context: Some(get_tx_context),
    get_block_hash: Some(get_block_hash),
    emit_log: Some(emit_log),
    access_account: Some(access_account),
    access_storage: Some(access_storage),
};

// =============================================================================
// Trampolines
// =============================================================================
//
// Safety for all of them: `context` is the pointer produced by
// `HostSlot::as_context` for the execution currently running on this thread,
// and pointer arguments are valid for the duration of the callback as
// required by the ABI.

/// Run `callback` against the host of `context` without letting a panic
/// cross the C boundary.
unsafe fn with_host<R>(
    context: *mut ffi::qrvmc_host_context,
    mut callback: impl FnMut(&mut dyn HostContext) -> R,
) -> R {
    let slot = unsafe { &mut *(context as *mut HostSlot<'_>) };
    if slot.panic.is_none() {
        let host = &mut *slot.host;
        match panic::catch_unwind(AssertUnwindSafe(|| callback(host))) {
            Ok(value) => return value,
            Err(payload) => {
                tracing::error!("Host callback panicked; finishing execution without host");
                slot.panic = Some(payload);
            }
        }
    }
    callback(&mut Unwound)
}

unsafe extern "C" fn account_exists(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
) -> bool {
    let address = unsafe { &*address };
    unsafe { with_host(context, |host| host.account_exists(address)) }
}

unsafe extern "C" fn get_storage(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
    key: *const ffi::qrvmc_bytes32,
) -> ffi::qrvmc_bytes32 {
    let (address, key) = unsafe { (&*address, &*key) };
    unsafe { with_host(context, |host| host.get_storage(address, key)) }
}

unsafe extern "C" fn set_storage(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
    key: *const ffi::qrvmc_bytes32,
    value: *const ffi::qrvmc_bytes32,
) -> ffi::qrvmc_storage_status {
    let (address, key, value) = unsafe { (&*address, &*key, &*value) };
    unsafe { with_host(context, |host| host.set_storage(address, key, value)) }.into()
}

unsafe extern "C" fn get_balance(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
) -> ffi::qrvmc_uint256be {
    let address = unsafe { &*address };
    unsafe { with_host(context, |host| host.get_balance(address)) }
}

unsafe extern "C" fn get_code_size(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
) -> usize {
    let address = unsafe { &*address };
    unsafe { with_host(context, |host| host.get_code_size(address)) }
}

unsafe extern "C" fn get_code_hash(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
) -> ffi::qrvmc_bytes32 {
    let address = unsafe { &*address };
    unsafe { with_host(context, |host| host.get_code_hash(address)) }
}

unsafe extern "C" fn copy_code(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize {
    let address = unsafe { &*address };
    let buffer: &mut [u8] = if buffer_data.is_null() || buffer_size == 0 {
        &mut []
    } else {
        unsafe { std::slice::from_raw_parts_mut(buffer_data, buffer_size) }
    };
    unsafe { with_host(context, |host| host.copy_code(address, code_offset, buffer)) }
}

unsafe extern "C" fn call(
    context: *mut ffi::qrvmc_host_context,
    msg: *const ffi::qrvmc_message,
) -> ffi::qrvmc_result {
    let message = unsafe { ExecutionMessage::from_ffi(&*msg) };
    unsafe { with_host(context, |host| host.call(&message)) }.into_native()
}

unsafe extern "C" fn get_tx_context(
    context: *mut ffi::qrvmc_host_context,
) -> ffi::qrvmc_tx_context {
    unsafe { with_host(context, |host| host.get_tx_context()) }
}

unsafe extern "C" fn get_block_hash(
    context: *mut ffi::qrvmc_host_context,
    number: i64,
) -> ffi::qrvmc_bytes32 {
    unsafe { with_host(context, |host| host.get_block_hash(number)) }
}

unsafe extern "C" fn emit_log(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
    data: *const u8,
    data_size: usize,
    topics: *const ffi::qrvmc_bytes32,
    topics_count: usize,
) {
    let address = unsafe { &*address };
    let data: &[u8] = if data.is_null() || data_size == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data, data_size) }
    };
    let topics: &[Bytes32] = if topics.is_null() || topics_count == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(topics, topics_count) }
    };
    unsafe { with_host(context, |host| host.emit_log(address, data, topics)) }
}

unsafe extern "C" fn access_account(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
) -> ffi::qrvmc_access_status {
    let address = unsafe { &*address };
    unsafe { with_host(context, |host| host.access_account(address)) }.into()
}

unsafe extern "C" fn access_storage(
    context: *mut ffi::qrvmc_host_context,
    address: *const ffi::qrvmc_address,
    key: *const ffi::qrvmc_bytes32,
) -> ffi::qrvmc_access_status {
    let (address, key) = unsafe { (&*address, &*key) };
    unsafe { with_host(context, |host| host.access_storage(address, key)) }.into()
}
