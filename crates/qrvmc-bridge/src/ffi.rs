//! C ABI definitions of the QRVMC connector contract.
//!
//! This module mirrors `qrvmc.h` at ABI version 10: the plain data structs
//! exchanged with a VM, the host interface the VM calls back into, the VM
//! function table, and the two entry points exported by a connector binding.
//!
//! Enumerations that cross the boundary are plain integers with named
//! constants. A native module may hand back values this crate does not know
//! about, and a Rust enum would make that undefined behavior.

#![allow(non_camel_case_types)]

use std::ffi::c_char;

/// ABI version implemented by this crate.
pub const QRVMC_ABI_VERSION: i32 = 10;

// =============================================================================
// Plain Data
// =============================================================================

/// 20-byte account address.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct qrvmc_address {
    pub bytes: [u8; 20],
}

/// 32 bytes of opaque data, used for hashes and storage words.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct qrvmc_bytes32 {
    pub bytes: [u8; 32],
}

/// Big-endian 256-bit integer.
pub type qrvmc_uint256be = qrvmc_bytes32;

pub type qrvmc_call_kind = i32;
pub const QRVMC_CALL: qrvmc_call_kind = 0;
pub const QRVMC_DELEGATECALL: qrvmc_call_kind = 1;
pub const QRVMC_CREATE: qrvmc_call_kind = 3;
pub const QRVMC_CREATE2: qrvmc_call_kind = 4;

pub type qrvmc_flags = u32;
pub const QRVMC_STATIC: qrvmc_flags = 1;

pub type qrvmc_status_code = i32;
pub const QRVMC_SUCCESS: qrvmc_status_code = 0;
pub const QRVMC_FAILURE: qrvmc_status_code = 1;
pub const QRVMC_REVERT: qrvmc_status_code = 2;
pub const QRVMC_OUT_OF_GAS: qrvmc_status_code = 3;
pub const QRVMC_INVALID_INSTRUCTION: qrvmc_status_code = 4;
pub const QRVMC_UNDEFINED_INSTRUCTION: qrvmc_status_code = 5;
pub const QRVMC_STACK_OVERFLOW: qrvmc_status_code = 6;
pub const QRVMC_STACK_UNDERFLOW: qrvmc_status_code = 7;
pub const QRVMC_BAD_JUMP_DESTINATION: qrvmc_status_code = 8;
pub const QRVMC_INVALID_MEMORY_ACCESS: qrvmc_status_code = 9;
pub const QRVMC_CALL_DEPTH_EXCEEDED: qrvmc_status_code = 10;
pub const QRVMC_STATIC_MODE_VIOLATION: qrvmc_status_code = 11;
pub const QRVMC_PRECOMPILE_FAILURE: qrvmc_status_code = 12;
pub const QRVMC_CONTRACT_VALIDATION_FAILURE: qrvmc_status_code = 13;
pub const QRVMC_ARGUMENT_OUT_OF_RANGE: qrvmc_status_code = 14;
pub const QRVMC_INSUFFICIENT_BALANCE: qrvmc_status_code = 17;
pub const QRVMC_INTERNAL_ERROR: qrvmc_status_code = -1;
pub const QRVMC_REJECTED: qrvmc_status_code = -2;
pub const QRVMC_OUT_OF_MEMORY: qrvmc_status_code = -3;

pub type qrvmc_revision = i32;
pub const QRVMC_SHANGHAI: qrvmc_revision = 0;
pub const QRVMC_MAX_REVISION: qrvmc_revision = QRVMC_SHANGHAI;
pub const QRVMC_LATEST_STABLE_REVISION: qrvmc_revision = QRVMC_SHANGHAI;

pub type qrvmc_storage_status = i32;
pub const QRVMC_STORAGE_ASSIGNED: qrvmc_storage_status = 0;
pub const QRVMC_STORAGE_ADDED: qrvmc_storage_status = 1;
pub const QRVMC_STORAGE_DELETED: qrvmc_storage_status = 2;
pub const QRVMC_STORAGE_MODIFIED: qrvmc_storage_status = 3;
pub const QRVMC_STORAGE_DELETED_ADDED: qrvmc_storage_status = 4;
pub const QRVMC_STORAGE_MODIFIED_DELETED: qrvmc_storage_status = 5;
pub const QRVMC_STORAGE_DELETED_RESTORED: qrvmc_storage_status = 6;
pub const QRVMC_STORAGE_ADDED_DELETED: qrvmc_storage_status = 7;
pub const QRVMC_STORAGE_MODIFIED_RESTORED: qrvmc_storage_status = 8;

pub type qrvmc_access_status = i32;
pub const QRVMC_ACCESS_COLD: qrvmc_access_status = 0;
pub const QRVMC_ACCESS_WARM: qrvmc_access_status = 1;

pub type qrvmc_capabilities_flagset = u32;
pub const QRVMC_CAPABILITY_QRVM1: qrvmc_capabilities_flagset = 1 << 0;
pub const QRVMC_CAPABILITY_ZWASM: qrvmc_capabilities_flagset = 1 << 1;
pub const QRVMC_CAPABILITY_PRECOMPILES: qrvmc_capabilities_flagset = 1 << 2;

pub type qrvmc_set_option_result = i32;
pub const QRVMC_SET_OPTION_SUCCESS: qrvmc_set_option_result = 0;
pub const QRVMC_SET_OPTION_INVALID_NAME: qrvmc_set_option_result = 1;
pub const QRVMC_SET_OPTION_INVALID_VALUE: qrvmc_set_option_result = 2;

pub type qrvmc_loader_error_code = i32;
pub const QRVMC_LOADER_SUCCESS: qrvmc_loader_error_code = 0;
pub const QRVMC_LOADER_CANNOT_OPEN: qrvmc_loader_error_code = 1;
pub const QRVMC_LOADER_SYMBOL_NOT_FOUND: qrvmc_loader_error_code = 2;
pub const QRVMC_LOADER_INVALID_ARGUMENT: qrvmc_loader_error_code = 3;
pub const QRVMC_LOADER_VM_CREATION_FAILURE: qrvmc_loader_error_code = 4;
pub const QRVMC_LOADER_ABI_VERSION_MISMATCH: qrvmc_loader_error_code = 5;
pub const QRVMC_LOADER_INVALID_OPTION_NAME: qrvmc_loader_error_code = 6;
pub const QRVMC_LOADER_INVALID_OPTION_VALUE: qrvmc_loader_error_code = 7;
pub const QRVMC_LOADER_UNSPECIFIED_ERROR: qrvmc_loader_error_code = -1;

/// Parameters of a single call or create.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct qrvmc_message {
    pub kind: qrvmc_call_kind,
    pub flags: qrvmc_flags,
    pub depth: i32,
    pub gas: i64,
    pub recipient: qrvmc_address,
    pub sender: qrvmc_address,
    pub input_data: *const u8,
    pub input_size: usize,
    pub value: qrvmc_uint256be,
    pub create2_salt: qrvmc_bytes32,
    pub code_address: qrvmc_address,
}

/// Releases the resources held by a result. Called at most once.
pub type qrvmc_release_result_fn = unsafe extern "C" fn(result: *const qrvmc_result);

/// Outcome of an execution.
#[repr(C)]
#[derive(Debug)]
pub struct qrvmc_result {
    pub status_code: qrvmc_status_code,
    pub gas_left: i64,
    pub gas_refund: i64,
    pub output_data: *const u8,
    pub output_size: usize,
    pub release: Option<qrvmc_release_result_fn>,
    pub create_address: qrvmc_address,
    pub padding: [u8; 4],
}

/// Transaction and block data.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct qrvmc_tx_context {
    pub tx_gas_price: qrvmc_uint256be,
    pub tx_origin: qrvmc_address,
    pub block_coinbase: qrvmc_address,
    pub block_number: i64,
    pub block_timestamp: i64,
    pub block_gas_limit: i64,
    pub block_prev_randao: qrvmc_uint256be,
    pub chain_id: qrvmc_uint256be,
    pub block_base_fee: qrvmc_uint256be,
}

/// Opaque host state handed to every host callback.
#[repr(C)]
pub struct qrvmc_host_context {
    _private: [u8; 0],
}

// =============================================================================
// Host Interface
// =============================================================================

pub type qrvmc_account_exists_fn =
    unsafe extern "C" fn(context: *mut qrvmc_host_context, address: *const qrvmc_address) -> bool;

pub type qrvmc_get_storage_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    address: *const qrvmc_address,
    key: *const qrvmc_bytes32,
) -> qrvmc_bytes32;

pub type qrvmc_set_storage_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    address: *const qrvmc_address,
    key: *const qrvmc_bytes32,
    value: *const qrvmc_bytes32,
) -> qrvmc_storage_status;

pub type qrvmc_get_balance_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    address: *const qrvmc_address,
) -> qrvmc_uint256be;

pub type qrvmc_get_code_size_fn =
    unsafe extern "C" fn(context: *mut qrvmc_host_context, address: *const qrvmc_address) -> usize;

pub type qrvmc_get_code_hash_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    address: *const qrvmc_address,
) -> qrvmc_bytes32;

pub type qrvmc_copy_code_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    address: *const qrvmc_address,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize;

pub type qrvmc_call_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    msg: *const qrvmc_message,
) -> qrvmc_result;

pub type qrvmc_get_tx_context_fn =
    unsafe extern "C" fn(context: *mut qrvmc_host_context) -> qrvmc_tx_context;

pub type qrvmc_get_block_hash_fn =
    unsafe extern "C" fn(context: *mut qrvmc_host_context, number: i64) -> qrvmc_bytes32;

pub type qrvmc_emit_log_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    address: *const qrvmc_address,
    data: *const u8,
    data_size: usize,
    topics: *const qrvmc_bytes32,
    topics_count: usize,
);

pub type qrvmc_access_account_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    address: *const qrvmc_address,
) -> qrvmc_access_status;

pub type qrvmc_access_storage_fn = unsafe extern "C" fn(
    context: *mut qrvmc_host_context,
    address: *const qrvmc_address,
    key: *const qrvmc_bytes32,
) -> qrvmc_access_status;

/// Callback table the VM uses to reach the host.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct qrvmc_host_interface {
    pub account_exists: Option<qrvmc_account_exists_fn>,
    pub get_storage: Option<qrvmc_get_storage_fn>,
    pub set_storage: Option<qrvmc_set_storage_fn>,
    pub get_balance: Option<qrvmc_get_balance_fn>,
    pub get_code_size: Option<qrvmc_get_code_size_fn>,
    pub get_code_hash: Option<qrvmc_get_code_hash_fn>,
    pub copy_code: Option<qrvmc_copy_code_fn>,
    pub call: Option<qrvmc_call_fn>,
    pub get_tx_context: Option<qrvmc_get_tx_context_fn>,
    pub get_block_hash: Option<qrvmc_get_block_hash_fn>,
    pub emit_log: Option<qrvmc_emit_log_fn>,
    pub access_account: Option<qrvmc_access_account_fn>,
    pub access_storage: Option<qrvmc_access_storage_fn>,
}

// =============================================================================
// VM Function Table
// =============================================================================

pub type qrvmc_destroy_fn = unsafe extern "C" fn(vm: *mut qrvmc_vm);

pub type qrvmc_execute_fn = unsafe extern "C" fn(
    vm: *mut qrvmc_vm,
    host: *const qrvmc_host_interface,
    context: *mut qrvmc_host_context,
    rev: qrvmc_revision,
    msg: *const qrvmc_message,
    code: *const u8,
    code_size: usize,
) -> qrvmc_result;

pub type qrvmc_get_capabilities_fn =
    unsafe extern "C" fn(vm: *mut qrvmc_vm) -> qrvmc_capabilities_flagset;

pub type qrvmc_set_option_fn = unsafe extern "C" fn(
    vm: *mut qrvmc_vm,
    name: *const c_char,
    value: *const c_char,
) -> qrvmc_set_option_result;

/// A VM instance as laid out by the native module.
///
/// `destroy`, `execute` and `get_capabilities` are mandatory; `set_option`
/// is null when the VM takes no options.
#[repr(C)]
#[derive(Debug)]
pub struct qrvmc_vm {
    pub abi_version: i32,
    pub name: *const c_char,
    pub version: *const c_char,
    pub destroy: Option<qrvmc_destroy_fn>,
    pub execute: Option<qrvmc_execute_fn>,
    pub get_capabilities: Option<qrvmc_get_capabilities_fn>,
    pub set_option: Option<qrvmc_set_option_fn>,
}

// =============================================================================
// Connector Binding Entry Points
// =============================================================================

/// Loads the VM named by `filename` and creates an instance of it.
///
/// Returns null on failure and writes a loader error code to `error_code`
/// when it is not null.
pub type qrvmc_load_and_create_fn = unsafe extern "C" fn(
    filename: *const c_char,
    error_code: *mut qrvmc_loader_error_code,
) -> *mut qrvmc_vm;

/// Returns the message of the last loader failure once, then null.
pub type qrvmc_last_error_msg_fn = unsafe extern "C" fn() -> *const c_char;

pub const LOAD_AND_CREATE_SYMBOL: &[u8] = b"qrvmc_load_and_create\0";
pub const LAST_ERROR_MSG_SYMBOL: &[u8] = b"qrvmc_last_error_msg\0";
