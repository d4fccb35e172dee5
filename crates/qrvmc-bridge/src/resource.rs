//! Sources of bundled connector binaries.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::platform::LibraryExtension;

/// Where bundled binaries are read from during extraction.
pub trait ResourceSource: Send + Sync {
    /// Open the resource called `name` for reading.
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// Resource name of the bundled binary: `lib<name>.<ext>`.
pub fn resource_name(library_name: &str, extension: LibraryExtension) -> String {
    format!("lib{}.{}", library_name, extension.as_str())
}

/// Resources stored as files in a directory.
#[derive(Debug, Clone)]
pub struct ResourceDir {
    root: PathBuf,
}

impl ResourceDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl ResourceSource for ResourceDir {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(self.root.join(name))?;
        Ok(Box::new(file))
    }
}

/// Resources compiled into the binary, e.g. with `include_bytes!`.
///
/// The default value has no resources; every lookup fails with `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResources {
    entries: HashMap<String, &'static [u8]>,
}

impl EmbeddedResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, bytes: &'static [u8]) -> Self {
        self.entries.insert(name.into(), bytes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceSource for EmbeddedResources {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        match self.entries.get(name) {
            Some(bytes) => Ok(Box::new(*bytes)),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("bundled resource '{}' not found", name),
            )),
        }
    }
}
