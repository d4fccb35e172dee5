//! Native library file extension per operating system.

use std::fmt;

/// Conventional dynamic-library extension of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryExtension {
    Windows,
    Unix,
    Mac,
    /// No known pattern matched. Extraction cannot proceed.
    Unknown,
}

impl LibraryExtension {
    /// Classify an OS identifier such as `std::env::consts::OS` or a
    /// `os.name`-style string ("Windows 10", "Mac OS X", "Linux").
    ///
    /// Matching is a case-insensitive substring test. Mac is checked first
    /// because "darwin" contains "win".
    pub fn for_os(os: &str) -> Self {
        let os = os.to_ascii_lowercase();
        if os.contains("mac") || os.contains("darwin") {
            Self::Mac
        } else if os.contains("win") {
            Self::Windows
        } else if os.contains("nix") || os.contains("nux") || os.contains("aix") {
            Self::Unix
        } else {
            Self::Unknown
        }
    }

    pub fn current() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// Extension without the leading dot, or "unknown".
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "dll",
            Self::Unix => "so",
            Self::Mac => "dylib",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LibraryExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_platforms() {
        assert_eq!(LibraryExtension::for_os("Windows 10"), LibraryExtension::Windows);
        assert_eq!(LibraryExtension::for_os("windows"), LibraryExtension::Windows);
        assert_eq!(LibraryExtension::for_os("Linux"), LibraryExtension::Unix);
        assert_eq!(LibraryExtension::for_os("AIX"), LibraryExtension::Unix);
        assert_eq!(LibraryExtension::for_os("minix"), LibraryExtension::Unix);
        assert_eq!(LibraryExtension::for_os("Mac OS X"), LibraryExtension::Mac);
        assert_eq!(LibraryExtension::for_os("macos"), LibraryExtension::Mac);
    }

    #[test]
    fn test_darwin_is_not_windows() {
        assert_eq!(LibraryExtension::for_os("Darwin"), LibraryExtension::Mac);
    }

    #[test]
    fn test_unknown_is_sentinel() {
        let ext = LibraryExtension::for_os("plan9");
        assert_eq!(ext, LibraryExtension::Unknown);
        assert!(!ext.is_known());
        assert_eq!(ext.as_str(), "unknown");
        assert_eq!(LibraryExtension::for_os(""), LibraryExtension::Unknown);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(LibraryExtension::Windows.to_string(), "dll");
        assert_eq!(LibraryExtension::Unix.to_string(), "so");
        assert_eq!(LibraryExtension::Mac.to_string(), "dylib");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_current_on_linux() {
        assert_eq!(LibraryExtension::current(), LibraryExtension::Unix);
    }
}
