//! Extraction of the bundled connector binary to a temporary file.
//!
//! A bundled binary cannot be loaded from inside a resource container, so it
//! is copied to a uniquely named file first:
//!
//! 1. Copy the resource to `<temp-dir>/lib<name>-<uuid>.<ext>`
//! 2. Load the copy from its absolute path
//! 3. Remove the copy as soon as the platform allows
//!
//! On Unix a loaded library stays mapped after its file is unlinked, so the
//! copy is removed right after a successful load. Elsewhere the file is
//! registered for deletion when the process exits.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use uuid::Uuid;

use crate::platform::LibraryExtension;
use crate::resource::{ResourceSource, resource_name};

/// Copies bundled binaries into a temporary directory.
#[derive(Debug, Clone)]
pub struct Extractor {
    temp_dir: PathBuf,
}

impl Extractor {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Copy the bundled binary of `library_name` into a fresh temp file.
    ///
    /// Any pre-existing file at the generated path is replaced. On error no
    /// partial file is left behind.
    pub fn extract(
        &self,
        source: &dyn ResourceSource,
        library_name: &str,
        extension: LibraryExtension,
    ) -> io::Result<PathBuf> {
        let resource = resource_name(library_name, extension);
        let mut reader = source.open(&resource)?;

        fs::create_dir_all(&self.temp_dir)?;

        let file_name = format!("lib{}-{}.{}", library_name, Uuid::new_v4(), extension.as_str());
        let path = std::path::absolute(self.temp_dir.join(file_name))?;

        let copied = File::create(&path).and_then(|mut file| {
            let bytes = io::copy(&mut reader, &mut file)?;
            file.sync_all()?;
            Ok(bytes)
        });

        match copied {
            Ok(bytes) => {
                tracing::debug!(
                    "Extracted {} ({} bytes) -> {}",
                    resource,
                    bytes,
                    path.display()
                );
                Ok(path)
            }
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e)
            }
        }
    }

    /// Dispose of an extracted file whose library is now loaded.
    pub fn release(&self, path: &Path) {
        #[cfg(unix)]
        {
            match fs::remove_file(path) {
                Ok(()) => {
                    tracing::debug!("Unlinked loaded library copy: {}", path.display());
                    return;
                }
                Err(e) => {
                    tracing::warn!("Failed to unlink {}: {}", path.display(), e);
                }
            }
        }

        delete_on_exit(path);
    }

    /// Remove an extracted file that failed to load.
    pub fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

// =============================================================================
// Exit-time cleanup
// =============================================================================

static PENDING: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
static INSTALL_HOOK: Once = Once::new();

/// Register `path` for best-effort deletion when the process exits normally.
pub fn delete_on_exit(path: &Path) {
    INSTALL_HOOK.call_once(|| {
        // Safety: run_pending is a plain extern "C" fn without arguments.
        let rc = unsafe { libc::atexit(run_pending) };
        if rc != 0 {
            tracing::warn!("Failed to register exit cleanup hook");
        }
    });

    let mut pending = PENDING.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    pending.push(path.to_path_buf());
    tracing::debug!("Scheduled {} for deletion at exit", path.display());
}

/// Paths currently scheduled for deletion at exit.
pub fn pending_deletions() -> Vec<PathBuf> {
    PENDING
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

extern "C" fn run_pending() {
    let paths = match PENDING.lock() {
        Ok(mut pending) => std::mem::take(&mut *pending),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };
    for path in paths {
        let _ = fs::remove_file(path);
    }
}
