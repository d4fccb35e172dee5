//! Execution message passed into a VM and received by host `call`.

use std::ptr;

use crate::ffi;
use crate::types::{Address, Bytes32, CallKind, Uint256};

/// Owned parameters of a single call or create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMessage {
    pub kind: CallKind,
    pub flags: u32,
    pub depth: i32,
    pub gas: i64,
    pub recipient: Address,
    pub sender: Address,
    pub input: Vec<u8>,
    pub value: Uint256,
    pub create2_salt: Bytes32,
    pub code_address: Address,
}

impl ExecutionMessage {
    /// A plain call from `sender` to `recipient` with the given gas limit.
    pub fn call(sender: Address, recipient: Address, gas: i64) -> Self {
        Self {
            kind: CallKind::Call,
            flags: 0,
            depth: 0,
            gas,
            recipient,
            sender,
            input: Vec::new(),
            value: Uint256::default(),
            create2_salt: Bytes32::default(),
            code_address: recipient,
        }
    }

    pub fn with_kind(mut self, kind: CallKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_value(mut self, value: Uint256) -> Self {
        self.value = value;
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    /// Mark the call as static (no state modification allowed).
    pub fn into_static(mut self) -> Self {
        self.flags |= ffi::QRVMC_STATIC;
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags & ffi::QRVMC_STATIC != 0
    }

    /// Lower to the C layout.
    ///
    /// The returned struct borrows `self.input`; it must not outlive `self`.
    pub(crate) fn as_ffi(&self) -> ffi::qrvmc_message {
        let input_data = if self.input.is_empty() {
            ptr::null()
        } else {
            self.input.as_ptr()
        };

        ffi::qrvmc_message {
            kind: self.kind.into(),
            flags: self.flags,
            depth: self.depth,
            gas: self.gas,
            recipient: self.recipient,
            sender: self.sender,
            input_data,
            input_size: self.input.len(),
            value: self.value,
            create2_salt: self.create2_salt,
            code_address: self.code_address,
        }
    }

    /// Copy a native message into an owned one.
    ///
    /// # Safety
    /// `input_data` must be null or point to `input_size` readable bytes.
    pub(crate) unsafe fn from_ffi(message: &ffi::qrvmc_message) -> Self {
        let input = if message.input_data.is_null() || message.input_size == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(message.input_data, message.input_size) }.to_vec()
        };

        Self {
            kind: CallKind::from(message.kind),
            flags: message.flags,
            depth: message.depth,
            gas: message.gas,
            recipient: message.recipient,
            sender: message.sender,
            input,
            value: message.value,
            create2_salt: message.create2_salt,
            code_address: message.code_address,
        }
    }
}
