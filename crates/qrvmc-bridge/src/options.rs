//! Configuration strings of the form `<selector>[,<name>[=<value>]]*`.
//!
//! ```text
//! "./libvm.so,trace,mode=fast"
//!     selector: "./libvm.so"
//!     options:  [("trace", ""), ("mode", "fast")]
//! ```

use crate::error::{Error, Result};
use crate::types::{LoaderErrorCode, SetOptionResult};
use crate::vm::VmInstance;

/// Configurations of this many bytes or more are rejected.
pub const MAX_CONFIG_LENGTH: usize = 4096;

/// A parsed configuration string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfiguration {
    pub selector: String,
    pub options: Vec<(String, String)>,
}

impl VmConfiguration {
    /// Split a configuration string into selector and options.
    ///
    /// A single trailing comma is ignored. Names and values may be empty.
    pub fn parse(config: &str) -> Result<Self> {
        if config.len() >= MAX_CONFIG_LENGTH {
            return Err(Error::creation(
                LoaderErrorCode::InvalidArgument,
                format!(
                    "invalid argument: configuration is too long (maximum allowed length is {})",
                    MAX_CONFIG_LENGTH
                ),
            ));
        }
        if config.contains('\0') {
            return Err(Error::creation(
                LoaderErrorCode::InvalidArgument,
                "invalid argument: configuration contains a NUL byte",
            ));
        }

        let (selector, mut rest) = split_token(config, ',');
        let mut options = Vec::new();
        while !rest.is_empty() {
            let (option, tail) = split_token(rest, ',');
            let (name, value) = split_token(option, '=');
            options.push((name.to_string(), value.to_string()));
            rest = tail;
        }

        Ok(Self {
            selector: selector.to_string(),
            options,
        })
    }

    /// Apply the options in order, stopping at the first failure.
    pub fn apply(&self, vm: &VmInstance) -> Result<()> {
        if self.options.is_empty() {
            return Ok(());
        }

        let vm_name = vm.name()?;
        if !vm.supports_options()? {
            return Err(Error::creation(
                LoaderErrorCode::InvalidOptionName,
                format!("{} ({}) does not support any options", vm_name, self.selector),
            ));
        }

        for (name, value) in &self.options {
            let (code, message) = match vm.set_option(name, value)? {
                SetOptionResult::Success => continue,
                SetOptionResult::InvalidName => (
                    LoaderErrorCode::InvalidOptionName,
                    format!("{} ({}): unknown option '{}'", vm_name, self.selector, name),
                ),
                SetOptionResult::InvalidValue => (
                    LoaderErrorCode::InvalidOptionValue,
                    format!(
                        "{} ({}): unsupported value '{}' for option '{}'",
                        vm_name, self.selector, value, name
                    ),
                ),
                SetOptionResult::Other(_) => (
                    LoaderErrorCode::InvalidOptionValue,
                    format!(
                        "{} ({}): unknown error when setting value '{}' for option '{}'",
                        vm_name, self.selector, value, name
                    ),
                ),
            };
            return Err(Error::creation(code, message));
        }

        Ok(())
    }
}

/// Text before the first `delim` and the text after it. Without `delim`
/// the whole input is the token and the rest is empty.
fn split_token(input: &str, delim: char) -> (&str, &str) {
    match input.split_once(delim) {
        Some((token, rest)) => (token, rest),
        None => (input, ""),
    }
}
