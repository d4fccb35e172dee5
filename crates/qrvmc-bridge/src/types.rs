//! Rust-side names for the values exchanged with a VM.
//!
//! Conversions from raw integers never fail: codes this crate does not know
//! are kept in an `Other` variant so they can be reported unchanged.

use std::fmt;

use crate::ffi;

/// Account address.
pub type Address = ffi::qrvmc_address;

/// 32 bytes value (used for hashes and storage words).
pub type Bytes32 = ffi::qrvmc_bytes32;

/// Big-endian 256-bit integer.
pub type Uint256 = ffi::qrvmc_uint256be;

/// Transaction and block data returned by the host.
pub type TxContext = ffi::qrvmc_tx_context;

/// VM revision an execution runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision(i32);

impl Revision {
    pub const SHANGHAI: Revision = Revision(ffi::QRVMC_SHANGHAI);
    pub const LATEST_STABLE: Revision = Revision(ffi::QRVMC_LATEST_STABLE_REVISION);
    pub const MAX: Revision = Revision(ffi::QRVMC_MAX_REVISION);

    /// Wrap a raw revision number. Range checking is left to the VM.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self::LATEST_STABLE
    }
}

/// Kind of call a message describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Call,
    DelegateCall,
    Create,
    Create2,
    Other(i32),
}

impl From<i32> for CallKind {
    fn from(raw: i32) -> Self {
        match raw {
            ffi::QRVMC_CALL => Self::Call,
            ffi::QRVMC_DELEGATECALL => Self::DelegateCall,
            ffi::QRVMC_CREATE => Self::Create,
            ffi::QRVMC_CREATE2 => Self::Create2,
            other => Self::Other(other),
        }
    }
}

impl From<CallKind> for i32 {
    fn from(kind: CallKind) -> Self {
        match kind {
            CallKind::Call => ffi::QRVMC_CALL,
            CallKind::DelegateCall => ffi::QRVMC_DELEGATECALL,
            CallKind::Create => ffi::QRVMC_CREATE,
            CallKind::Create2 => ffi::QRVMC_CREATE2,
            CallKind::Other(raw) => raw,
        }
    }
}

/// Execution status reported by a VM or by a host `call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    Failure,
    Revert,
    OutOfGas,
    InvalidInstruction,
    UndefinedInstruction,
    StackOverflow,
    StackUnderflow,
    BadJumpDestination,
    InvalidMemoryAccess,
    CallDepthExceeded,
    StaticModeViolation,
    PrecompileFailure,
    ContractValidationFailure,
    ArgumentOutOfRange,
    InsufficientBalance,
    InternalError,
    Rejected,
    OutOfMemory,
    Other(i32),
}

impl StatusCode {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Revert => "revert",
            Self::OutOfGas => "out of gas",
            Self::InvalidInstruction => "invalid instruction",
            Self::UndefinedInstruction => "undefined instruction",
            Self::StackOverflow => "stack overflow",
            Self::StackUnderflow => "stack underflow",
            Self::BadJumpDestination => "bad jump destination",
            Self::InvalidMemoryAccess => "invalid memory access",
            Self::CallDepthExceeded => "call depth exceeded",
            Self::StaticModeViolation => "static mode violation",
            Self::PrecompileFailure => "precompile failure",
            Self::ContractValidationFailure => "contract validation failure",
            Self::ArgumentOutOfRange => "argument out of range",
            Self::InsufficientBalance => "insufficient balance",
            Self::InternalError => "internal error",
            Self::Rejected => "rejected",
            Self::OutOfMemory => "out of memory",
            Self::Other(raw) => return write!(f, "unknown status {}", raw),
        };
        f.write_str(name)
    }
}

impl From<i32> for StatusCode {
    fn from(raw: i32) -> Self {
        match raw {
            ffi::QRVMC_SUCCESS => Self::Success,
            ffi::QRVMC_FAILURE => Self::Failure,
            ffi::QRVMC_REVERT => Self::Revert,
            ffi::QRVMC_OUT_OF_GAS => Self::OutOfGas,
            ffi::QRVMC_INVALID_INSTRUCTION => Self::InvalidInstruction,
            ffi::QRVMC_UNDEFINED_INSTRUCTION => Self::UndefinedInstruction,
            ffi::QRVMC_STACK_OVERFLOW => Self::StackOverflow,
            ffi::QRVMC_STACK_UNDERFLOW => Self::StackUnderflow,
            ffi::QRVMC_BAD_JUMP_DESTINATION => Self::BadJumpDestination,
            ffi::QRVMC_INVALID_MEMORY_ACCESS => Self::InvalidMemoryAccess,
            ffi::QRVMC_CALL_DEPTH_EXCEEDED => Self::CallDepthExceeded,
            ffi::QRVMC_STATIC_MODE_VIOLATION => Self::StaticModeViolation,
            ffi::QRVMC_PRECOMPILE_FAILURE => Self::PrecompileFailure,
            ffi::QRVMC_CONTRACT_VALIDATION_FAILURE => Self::ContractValidationFailure,
            ffi::QRVMC_ARGUMENT_OUT_OF_RANGE => Self::ArgumentOutOfRange,
            ffi::QRVMC_INSUFFICIENT_BALANCE => Self::InsufficientBalance,
            ffi::QRVMC_INTERNAL_ERROR => Self::InternalError,
            ffi::QRVMC_REJECTED => Self::Rejected,
            ffi::QRVMC_OUT_OF_MEMORY => Self::OutOfMemory,
            other => Self::Other(other),
        }
    }
}

impl From<StatusCode> for i32 {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::Success => ffi::QRVMC_SUCCESS,
            StatusCode::Failure => ffi::QRVMC_FAILURE,
            StatusCode::Revert => ffi::QRVMC_REVERT,
            StatusCode::OutOfGas => ffi::QRVMC_OUT_OF_GAS,
            StatusCode::InvalidInstruction => ffi::QRVMC_INVALID_INSTRUCTION,
            StatusCode::UndefinedInstruction => ffi::QRVMC_UNDEFINED_INSTRUCTION,
            StatusCode::StackOverflow => ffi::QRVMC_STACK_OVERFLOW,
            StatusCode::StackUnderflow => ffi::QRVMC_STACK_UNDERFLOW,
            StatusCode::BadJumpDestination => ffi::QRVMC_BAD_JUMP_DESTINATION,
            StatusCode::InvalidMemoryAccess => ffi::QRVMC_INVALID_MEMORY_ACCESS,
            StatusCode::CallDepthExceeded => ffi::QRVMC_CALL_DEPTH_EXCEEDED,
            StatusCode::StaticModeViolation => ffi::QRVMC_STATIC_MODE_VIOLATION,
            StatusCode::PrecompileFailure => ffi::QRVMC_PRECOMPILE_FAILURE,
            StatusCode::ContractValidationFailure => ffi::QRVMC_CONTRACT_VALIDATION_FAILURE,
            StatusCode::ArgumentOutOfRange => ffi::QRVMC_ARGUMENT_OUT_OF_RANGE,
            StatusCode::InsufficientBalance => ffi::QRVMC_INSUFFICIENT_BALANCE,
            StatusCode::InternalError => ffi::QRVMC_INTERNAL_ERROR,
            StatusCode::Rejected => ffi::QRVMC_REJECTED,
            StatusCode::OutOfMemory => ffi::QRVMC_OUT_OF_MEMORY,
            StatusCode::Other(raw) => raw,
        }
    }
}

/// Effect of a storage write, reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageStatus {
    Assigned,
    Added,
    Deleted,
    Modified,
    DeletedAdded,
    ModifiedDeleted,
    DeletedRestored,
    AddedDeleted,
    ModifiedRestored,
}

impl From<StorageStatus> for i32 {
    fn from(status: StorageStatus) -> Self {
        match status {
            StorageStatus::Assigned => ffi::QRVMC_STORAGE_ASSIGNED,
            StorageStatus::Added => ffi::QRVMC_STORAGE_ADDED,
            StorageStatus::Deleted => ffi::QRVMC_STORAGE_DELETED,
            StorageStatus::Modified => ffi::QRVMC_STORAGE_MODIFIED,
            StorageStatus::DeletedAdded => ffi::QRVMC_STORAGE_DELETED_ADDED,
            StorageStatus::ModifiedDeleted => ffi::QRVMC_STORAGE_MODIFIED_DELETED,
            StorageStatus::DeletedRestored => ffi::QRVMC_STORAGE_DELETED_RESTORED,
            StorageStatus::AddedDeleted => ffi::QRVMC_STORAGE_ADDED_DELETED,
            StorageStatus::ModifiedRestored => ffi::QRVMC_STORAGE_MODIFIED_RESTORED,
        }
    }
}

/// Warm/cold access status, reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessStatus {
    #[default]
    Cold,
    Warm,
}

impl From<AccessStatus> for i32 {
    fn from(status: AccessStatus) -> Self {
        match status {
            AccessStatus::Cold => ffi::QRVMC_ACCESS_COLD,
            AccessStatus::Warm => ffi::QRVMC_ACCESS_WARM,
        }
    }
}

/// Outcome of `set_option` as reported by the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOptionResult {
    Success,
    InvalidName,
    InvalidValue,
    Other(i32),
}

impl From<i32> for SetOptionResult {
    fn from(raw: i32) -> Self {
        match raw {
            ffi::QRVMC_SET_OPTION_SUCCESS => Self::Success,
            ffi::QRVMC_SET_OPTION_INVALID_NAME => Self::InvalidName,
            ffi::QRVMC_SET_OPTION_INVALID_VALUE => Self::InvalidValue,
            other => Self::Other(other),
        }
    }
}

/// Error code reported by the connector binding's loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderErrorCode {
    Success,
    CannotOpen,
    SymbolNotFound,
    InvalidArgument,
    VmCreationFailure,
    AbiVersionMismatch,
    InvalidOptionName,
    InvalidOptionValue,
    Unspecified,
}

impl From<i32> for LoaderErrorCode {
    fn from(raw: i32) -> Self {
        match raw {
            ffi::QRVMC_LOADER_SUCCESS => Self::Success,
            ffi::QRVMC_LOADER_CANNOT_OPEN => Self::CannotOpen,
            ffi::QRVMC_LOADER_SYMBOL_NOT_FOUND => Self::SymbolNotFound,
            ffi::QRVMC_LOADER_INVALID_ARGUMENT => Self::InvalidArgument,
            ffi::QRVMC_LOADER_VM_CREATION_FAILURE => Self::VmCreationFailure,
            ffi::QRVMC_LOADER_ABI_VERSION_MISMATCH => Self::AbiVersionMismatch,
            ffi::QRVMC_LOADER_INVALID_OPTION_NAME => Self::InvalidOptionName,
            ffi::QRVMC_LOADER_INVALID_OPTION_VALUE => Self::InvalidOptionValue,
            _ => Self::Unspecified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_from_i32() {
        assert_eq!(StatusCode::from(0), StatusCode::Success);
        assert_eq!(StatusCode::from(2), StatusCode::Revert);
        assert_eq!(StatusCode::from(-1), StatusCode::InternalError);
        assert_eq!(StatusCode::from(99), StatusCode::Other(99));
        assert_eq!(i32::from(StatusCode::Other(99)), 99);
        assert_eq!(i32::from(StatusCode::OutOfGas), ffi::QRVMC_OUT_OF_GAS);
    }

    #[test]
    fn test_status_code_display() {
        assert_eq!(StatusCode::OutOfGas.to_string(), "out of gas");
        assert_eq!(StatusCode::Other(42).to_string(), "unknown status 42");
    }

    #[test]
    fn test_call_kind_keeps_unknown_values() {
        assert_eq!(CallKind::from(ffi::QRVMC_CREATE2), CallKind::Create2);
        assert_eq!(CallKind::from(2), CallKind::Other(2));
        assert_eq!(i32::from(CallKind::DelegateCall), 1);
    }

    #[test]
    fn test_set_option_result_from_i32() {
        assert_eq!(SetOptionResult::from(0), SetOptionResult::Success);
        assert_eq!(SetOptionResult::from(1), SetOptionResult::InvalidName);
        assert_eq!(SetOptionResult::from(2), SetOptionResult::InvalidValue);
        assert_eq!(SetOptionResult::from(-42), SetOptionResult::Other(-42));
    }

    #[test]
    fn test_loader_error_code_from_i32() {
        assert_eq!(LoaderErrorCode::from(0), LoaderErrorCode::Success);
        assert_eq!(LoaderErrorCode::from(5), LoaderErrorCode::AbiVersionMismatch);
        assert_eq!(LoaderErrorCode::from(-1), LoaderErrorCode::Unspecified);
        assert_eq!(LoaderErrorCode::from(1000), LoaderErrorCode::Unspecified);
    }

    #[test]
    fn test_default_revision_is_latest_stable() {
        assert_eq!(Revision::default(), Revision::LATEST_STABLE);
        assert_eq!(Revision::from_raw(7).as_raw(), 7);
    }
}
