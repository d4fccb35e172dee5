//! Capability bitmask advertised by a VM.

use std::fmt;
use std::ops::BitOr;

use crate::ffi;

/// Optional features a VM supports.
///
/// The mask may change after `set_option`, so it should be queried again
/// after configuring a VM rather than cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u32);

impl Capabilities {
    /// Runs QRVM1 bytecode.
    pub const QRVM1: Capabilities = Capabilities(ffi::QRVMC_CAPABILITY_QRVM1);
    /// Runs ZWASM bytecode.
    pub const ZWASM: Capabilities = Capabilities(ffi::QRVMC_CAPABILITY_ZWASM);
    /// Provides precompiled contracts.
    pub const PRECOMPILES: Capabilities = Capabilities(ffi::QRVMC_CAPABILITY_PRECOMPILES);

    const NAMED: [(Capabilities, &'static str); 3] = [
        (Self::QRVM1, "qrvm1"),
        (Self::ZWASM, "zwasm"),
        (Self::PRECOMPILES, "precompiles"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every flag of `other` is set in `self`.
    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Self) -> Self::Output {
        Capabilities(self.0 | rhs.0)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }

        let mut names: Vec<String> = Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| (*name).to_string())
            .collect();

        let known = Self::NAMED.iter().fold(0, |acc, (flag, _)| acc | flag.0);
        let unknown = self.0 & !known;
        if unknown != 0 {
            names.push(format!("{:#x}", unknown));
        }

        f.write_str(&names.join("|"))
    }
}
