//! Resolver configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::resource::{EmbeddedResources, ResourceDir, ResourceSource};

/// Environment variable overriding the logical binding name.
pub const LIBRARY_NAME_ENV: &str = "QRVMC_LIBRARY_NAME";
/// Environment variable naming a directory of bundled binaries.
pub const RESOURCE_DIR_ENV: &str = "QRVMC_RESOURCE_DIR";
/// Environment variable overriding the extraction directory.
pub const TEMP_DIR_ENV: &str = "QRVMC_TEMP_DIR";

/// Logical name of the connector binding.
pub const DEFAULT_LIBRARY_NAME: &str = "qrvmc";

/// How the connector binding is located.
#[derive(Clone)]
pub struct ResolverConfig {
    /// Logical library name (`qrvmc` resolves to `libqrvmc.so` on Linux).
    pub library_name: String,
    /// OS identifier used to pick the bundled binary's extension.
    pub target_os: String,
    /// Where bundled binaries are read from.
    pub resources: Arc<dyn ResourceSource>,
    /// Directory receiving extracted binaries.
    pub temp_dir: PathBuf,
}

impl fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("library_name", &self.library_name)
            .field("target_os", &self.target_os)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            library_name: DEFAULT_LIBRARY_NAME.to_string(),
            target_os: std::env::consts::OS.to_string(),
            resources: Arc::new(EmbeddedResources::default()),
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl ResolverConfig {
    /// Defaults overridden by the `QRVMC_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(name) = non_empty_var(LIBRARY_NAME_ENV) {
            config.library_name = name;
        }
        if let Some(dir) = non_empty_var(RESOURCE_DIR_ENV) {
            config.resources = Arc::new(ResourceDir::new(dir));
        }
        if let Some(dir) = non_empty_var(TEMP_DIR_ENV) {
            config.temp_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    pub fn with_target_os(mut self, os: impl Into<String>) -> Self {
        self.target_os = os.into();
        self
    }

    pub fn with_resources(mut self, resources: impl ResourceSource + 'static) -> Self {
        self.resources = Arc::new(resources);
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.library_name, "qrvmc");
        assert_eq!(config.target_os, std::env::consts::OS);
        assert_eq!(config.temp_dir, std::env::temp_dir());
    }

    #[test]
    fn test_builders() {
        let config = ResolverConfig::default()
            .with_library_name("qrvmc-test")
            .with_target_os("Linux")
            .with_temp_dir("/tmp/qrvmc")
            .with_resources(EmbeddedResources::new().with("libqrvmc-test.so", b"x"));

        assert_eq!(config.library_name, "qrvmc-test");
        assert_eq!(config.target_os, "Linux");
        assert_eq!(config.temp_dir, PathBuf::from("/tmp/qrvmc"));
        assert!(config.resources.open("libqrvmc-test.so").is_ok());

        let debug = format!("{:?}", config);
        assert!(debug.contains("qrvmc-test"));
    }
}
