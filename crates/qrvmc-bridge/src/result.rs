//! Execution results crossing the boundary in both directions.
//!
//! Results coming out of a VM own native memory that must be handed back
//! through their `release` callback exactly once. Results going into a VM
//! (answers to a host `call`) own Rust memory and carry a release callback
//! that reclaims it.

use std::ptr;

use crate::ffi;
use crate::types::{Address, StatusCode};

/// RAII guard for a native result.
/// Ensures `release` is called even if copying the output panics.
struct NativeResultGuard {
    raw: ffi::qrvmc_result,
}

impl NativeResultGuard {
    fn output(&self) -> &[u8] {
        if self.raw.output_data.is_null() || self.raw.output_size == 0 {
            return &[];
        }
        // Safety: the VM guarantees output_data points to output_size bytes
        // until release is called.
        unsafe { std::slice::from_raw_parts(self.raw.output_data, self.raw.output_size) }
    }
}

impl Drop for NativeResultGuard {
    fn drop(&mut self) {
        if let Some(release) = self.raw.release {
            unsafe { release(&self.raw) };
        }
    }
}

/// Owned outcome of an execution.
///
/// Failures inside the VM (reverts, out of gas, ...) are reported through
/// [`status`](Self::status), never as a Rust error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    status: StatusCode,
    gas_left: i64,
    gas_refund: i64,
    output: Vec<u8>,
    create_address: Address,
}

impl ExecutionResult {
    pub fn new(status: StatusCode, gas_left: i64, output: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            gas_left,
            gas_refund: 0,
            output: output.into(),
            create_address: Address::default(),
        }
    }

    pub fn success(gas_left: i64, output: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::Success, gas_left, output)
    }

    pub fn revert(gas_left: i64, output: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::Revert, gas_left, output)
    }

    pub fn failure() -> Self {
        Self::new(StatusCode::Failure, 0, Vec::new())
    }

    pub fn with_gas_refund(mut self, gas_refund: i64) -> Self {
        self.gas_refund = gas_refund;
        self
    }

    pub fn with_create_address(mut self, address: Address) -> Self {
        self.create_address = address;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn gas_left(&self) -> i64 {
        self.gas_left
    }

    pub fn gas_refund(&self) -> i64 {
        self.gas_refund
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    pub fn create_address(&self) -> &Address {
        &self.create_address
    }

    /// Take ownership of a result produced by a VM, releasing its memory.
    ///
    /// # Safety
    /// `raw` must come from a VM call and must not have been released.
    pub(crate) unsafe fn from_native(raw: ffi::qrvmc_result) -> Self {
        let guard = NativeResultGuard { raw };
        Self {
            status: StatusCode::from(guard.raw.status_code),
            gas_left: guard.raw.gas_left,
            gas_refund: guard.raw.gas_refund,
            output: guard.output().to_vec(),
            create_address: guard.raw.create_address,
        }
    }

    /// Hand this result to a VM. The VM releases it through the installed callback.
    pub(crate) fn into_native(self) -> ffi::qrvmc_result {
        let (output_data, output_size) = if self.output.is_empty() {
            (ptr::null(), 0)
        } else {
            let boxed = self.output.into_boxed_slice();
            let size = boxed.len();
            (Box::into_raw(boxed) as *const u8, size)
        };

        ffi::qrvmc_result {
            status_code: self.status.into(),
            gas_left: self.gas_left,
            gas_refund: self.gas_refund,
            output_data,
            output_size,
            release: Some(release_boxed_output),
            create_address: self.create_address,
            padding: [0; 4],
        }
    }
}

/// Release callback for results built by [`ExecutionResult::into_native`].
unsafe extern "C" fn release_boxed_output(result: *const ffi::qrvmc_result) {
    let Some(result) = (unsafe { result.as_ref() }) else {
        return;
    };
    if result.output_data.is_null() {
        return;
    }
    let slice = ptr::slice_from_raw_parts_mut(result.output_data as *mut u8, result.output_size);
    drop(unsafe { Box::from_raw(slice) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static RELEASED: AtomicUsize = AtomicUsize::new(0);
    static OUTPUT: [u8; 3] = [1, 2, 3];

    unsafe extern "C" fn count_release(_result: *const ffi::qrvmc_result) {
        RELEASED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_from_native_copies_then_releases_once() {
        let raw = ffi::qrvmc_result {
            status_code: ffi::QRVMC_REVERT,
            gas_left: 7,
            gas_refund: 2,
            output_data: OUTPUT.as_ptr(),
            output_size: OUTPUT.len(),
            release: Some(count_release),
            create_address: Address::default(),
            padding: [0; 4],
        };

        let result = unsafe { ExecutionResult::from_native(raw) };

        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
        assert_eq!(result.status(), StatusCode::Revert);
        assert_eq!(result.gas_left(), 7);
        assert_eq!(result.gas_refund(), 2);
        assert_eq!(result.output(), &OUTPUT);
    }

    #[test]
    fn test_from_native_without_release_or_output() {
        let raw = ffi::qrvmc_result {
            status_code: 1234,
            gas_left: 0,
            gas_refund: 0,
            output_data: ptr::null(),
            output_size: 16,
            release: None,
            create_address: Address::default(),
            padding: [0; 4],
        };

        let result = unsafe { ExecutionResult::from_native(raw) };
        assert_eq!(result.status(), StatusCode::Other(1234));
        assert!(result.output().is_empty());
    }

    #[test]
    fn test_into_native_is_releasable() {
        let raw = ExecutionResult::success(42, vec![9u8; 64])
            .with_gas_refund(5)
            .into_native();

        assert_eq!(raw.status_code, ffi::QRVMC_SUCCESS);
        assert_eq!(raw.gas_refund, 5);
        assert_eq!(raw.output_size, 64);
        assert_eq!(unsafe { *raw.output_data.add(63) }, 9);

        let release = raw.release.expect("release callback installed");
        unsafe { release(&raw) };
    }

    #[test]
    fn test_into_native_empty_output() {
        let raw = ExecutionResult::failure().into_native();
        assert!(raw.output_data.is_null());
        assert_eq!(raw.output_size, 0);
        unsafe { release_boxed_output(&raw) };
    }
}
