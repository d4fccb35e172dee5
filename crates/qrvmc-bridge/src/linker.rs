//! Dynamic linking of the connector binding.
//!
//! The binding exports a creation entry point that loads and instantiates a
//! VM by selector, plus an optional function returning the message of the
//! last loader failure. [`Linker`] abstracts how the binding is opened so
//! resolution can be exercised without a real shared object.

use std::ffi::{CStr, CString, c_char};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use libloading::{Library, Symbol};

use crate::error::{Error, LinkError, Result};
use crate::ffi;
use crate::types::LoaderErrorCode;

/// Functions resolved from the connector binding.
#[derive(Debug, Clone, Copy)]
pub struct ConnectorEntryPoints {
    pub load_and_create: ffi::qrvmc_load_and_create_fn,
    pub last_error_msg: Option<ffi::qrvmc_last_error_msg_fn>,
}

/// How a connector module was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Found by the system loader under this file name.
    System(String),
    /// Loaded from an absolute path (an extracted bundled copy).
    Path(PathBuf),
    /// Linked into the process without a library file.
    Static,
}

/// A loaded connector binding. Never unloaded while referenced.
pub struct ConnectorModule {
    entry_points: ConnectorEntryPoints,
    origin: ModuleOrigin,
    _library: Option<Library>,
}

impl fmt::Debug for ConnectorModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorModule")
            .field("origin", &self.origin)
            .field("has_last_error_msg", &self.entry_points.last_error_msg.is_some())
            .finish()
    }
}

impl ConnectorModule {
    /// Resolve the entry points from an opened library.
    ///
    /// # Safety
    /// `library` must be a connector binding whose exported symbols have the
    /// signatures declared in [`ffi`].
    pub unsafe fn from_library(
        library: Library,
        origin: ModuleOrigin,
    ) -> std::result::Result<Self, LinkError> {
        let load_and_create = unsafe {
            let symbol: Symbol<ffi::qrvmc_load_and_create_fn> =
                library.get(ffi::LOAD_AND_CREATE_SYMBOL)?;
            *symbol
        };
        let last_error_msg = unsafe {
            library
                .get::<ffi::qrvmc_last_error_msg_fn>(ffi::LAST_ERROR_MSG_SYMBOL)
                .ok()
                .map(|symbol| *symbol)
        };

        Ok(Self {
            entry_points: ConnectorEntryPoints {
                load_and_create,
                last_error_msg,
            },
            origin,
            _library: Some(library),
        })
    }

    /// Wrap entry points that are already callable, e.g. statically linked.
    pub fn from_entry_points(entry_points: ConnectorEntryPoints, origin: ModuleOrigin) -> Self {
        Self {
            entry_points,
            origin,
            _library: None,
        }
    }

    pub fn origin(&self) -> &ModuleOrigin {
        &self.origin
    }

    pub fn entry_points(&self) -> ConnectorEntryPoints {
        self.entry_points
    }

    /// Ask the binding to create the VM named by `selector`.
    pub(crate) fn load_and_create(&self, selector: &str) -> Result<NonNull<ffi::qrvmc_vm>> {
        let c_selector = CString::new(selector).map_err(|_| {
            Error::creation(
                LoaderErrorCode::InvalidArgument,
                format!("invalid argument: selector contains a NUL byte: {:?}", selector),
            )
        })?;

        let mut code = ffi::QRVMC_LOADER_UNSPECIFIED_ERROR;
        let vm = unsafe { (self.entry_points.load_and_create)(c_selector.as_ptr(), &mut code) };

        match (NonNull::new(vm), code) {
            (Some(vm), ffi::QRVMC_LOADER_SUCCESS) => Ok(vm),
            (vm, code) => {
                if let Some(vm) = vm {
                    tracing::warn!(
                        "Binding returned a VM for '{}' together with error code {}; destroying it",
                        selector,
                        code
                    );
                    unsafe { crate::vm::destroy_raw(vm) };
                }
                let code = match LoaderErrorCode::from(code) {
                    LoaderErrorCode::Success => LoaderErrorCode::Unspecified,
                    other => other,
                };
                Err(Error::creation(code, self.take_error_message()))
            }
        }
    }

    /// Message of the last loader failure, consumed from the binding.
    fn take_error_message(&self) -> String {
        const FALLBACK: &str = "Loading QRVMC VM failed";

        let Some(last_error_msg) = self.entry_points.last_error_msg else {
            return FALLBACK.to_string();
        };
        let message = unsafe { last_error_msg() };
        if message.is_null() {
            return FALLBACK.to_string();
        }
        let message = unsafe { CStr::from_ptr(message) };
        match message.to_str() {
            Ok(s) if !s.is_empty() => s.to_string(),
            _ => FALLBACK.to_string(),
        }
    }
}

/// Opens connector bindings.
pub trait Linker: Send + Sync {
    /// Load by logical name through the system search path.
    fn open_system(&self, name: &str) -> std::result::Result<ConnectorModule, LinkError>;

    /// Load from an absolute file path.
    fn open_path(&self, path: &Path) -> std::result::Result<ConnectorModule, LinkError>;
}

/// [`Linker`] backed by the platform dynamic loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicLinker;

impl Linker for DynamicLinker {
    fn open_system(&self, name: &str) -> std::result::Result<ConnectorModule, LinkError> {
        let file_name = libloading::library_filename(name);
        tracing::debug!("Opening {} via system search path", file_name.to_string_lossy());

        let library = unsafe { Library::new(&file_name) }?;
        let origin = ModuleOrigin::System(file_name.to_string_lossy().into_owned());
        unsafe { ConnectorModule::from_library(library, origin) }
    }

    fn open_path(&self, path: &Path) -> std::result::Result<ConnectorModule, LinkError> {
        tracing::debug!("Opening {}", path.display());

        let library = unsafe { Library::new(path) }?;
        unsafe { ConnectorModule::from_library(library, ModuleOrigin::Path(path.to_path_buf())) }
    }
}
