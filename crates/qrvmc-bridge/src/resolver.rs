//! One-time resolution of the connector binding.
//!
//! Resolution runs at most once per [`LibraryResolver`]:
//!
//! 1. Load the binding by logical name through the system loader
//! 2. On failure, pick the platform extension from the configured OS
//! 3. Extract the bundled `lib<name>.<ext>` to a unique temp file
//! 4. Load the extracted file by absolute path
//!
//! The outcome is cached. A failed resolution is terminal: every later
//! [`create`](LibraryResolver::create) fails with the same recorded cause.

use std::sync::{Arc, OnceLock};

use crate::config::ResolverConfig;
use crate::error::{Error, LinkError, ResolutionError, Result};
use crate::extract::Extractor;
use crate::linker::{ConnectorModule, DynamicLinker, Linker};
use crate::options::VmConfiguration;
use crate::platform::LibraryExtension;
use crate::resource::resource_name;
use crate::vm::VmInstance;

/// Cached result of resolving the connector binding.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(Arc<ConnectorModule>),
    Failed(Arc<ResolutionError>),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Locates the connector binding and creates VM instances through it.
pub struct LibraryResolver {
    config: ResolverConfig,
    linker: Box<dyn Linker>,
    outcome: OnceLock<LoadOutcome>,
}

impl std::fmt::Debug for LibraryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryResolver")
            .field("config", &self.config)
            .field("outcome", &self.outcome.get())
            .finish()
    }
}

impl LibraryResolver {
    pub fn new(config: ResolverConfig, linker: impl Linker + 'static) -> Self {
        Self {
            config,
            linker: Box::new(linker),
            outcome: OnceLock::new(),
        }
    }

    /// Resolver using the platform dynamic loader.
    pub fn with_config(config: ResolverConfig) -> Self {
        Self::new(config, DynamicLinker)
    }

    /// The process-wide resolver, configured from the environment on first use.
    pub fn global() -> &'static LibraryResolver {
        static GLOBAL: OnceLock<LibraryResolver> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::with_config(ResolverConfig::from_env()))
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the binding if not done yet. Concurrent callers wait for the
    /// single attempt and observe the same outcome.
    pub fn initialize(&self) -> &LoadOutcome {
        self.outcome.get_or_init(|| self.resolve())
    }

    pub fn is_available(&self) -> bool {
        self.initialize().is_loaded()
    }

    /// The cached outcome, without triggering resolution.
    pub fn outcome(&self) -> Option<&LoadOutcome> {
        self.outcome.get()
    }

    /// Why resolution failed, if it did.
    pub fn resolution_error(&self) -> Option<Arc<ResolutionError>> {
        match self.initialize() {
            LoadOutcome::Loaded(_) => None,
            LoadOutcome::Failed(cause) => Some(cause.clone()),
        }
    }

    /// The resolved binding, or `LoaderUnavailable` with the recorded cause.
    pub fn connector(&self) -> Result<Arc<ConnectorModule>> {
        match self.initialize() {
            LoadOutcome::Loaded(module) => Ok(module.clone()),
            LoadOutcome::Failed(cause) => Err(Error::LoaderUnavailable(cause.clone())),
        }
    }

    /// Create the VM named by `selector`.
    pub fn create(&self, selector: &str) -> Result<VmInstance> {
        VmInstance::create(self.connector()?, selector)
    }

    /// Create a VM from `<selector>[,<name>[=<value>]]*` and apply its options.
    ///
    /// The VM is destroyed again if any option is rejected.
    pub fn create_configured(&self, config: &str) -> Result<VmInstance> {
        let configuration = VmConfiguration::parse(config)?;
        let vm = self.create(&configuration.selector)?;

        if let Err(e) = configuration.apply(&vm) {
            if let Err(destroy_err) = vm.destroy() {
                tracing::warn!("Failed to destroy rejected VM: {}", destroy_err);
            }
            return Err(e);
        }

        Ok(vm)
    }

    fn resolve(&self) -> LoadOutcome {
        let name = &self.config.library_name;
        tracing::debug!("Resolving connector binding '{}'", name);

        match self.linker.open_system(name) {
            Ok(module) => {
                tracing::info!("Loaded connector binding '{}' from system path", name);
                LoadOutcome::Loaded(Arc::new(module))
            }
            Err(system_err) => {
                tracing::debug!("System load of '{}' failed: {}", name, system_err);
                match self.load_bundled(system_err) {
                    Ok(module) => LoadOutcome::Loaded(Arc::new(module)),
                    Err(cause) => {
                        tracing::warn!("Connector binding unavailable: {}", cause);
                        LoadOutcome::Failed(Arc::new(cause))
                    }
                }
            }
        }
    }

    fn load_bundled(
        &self,
        system_err: LinkError,
    ) -> std::result::Result<ConnectorModule, ResolutionError> {
        let name = &self.config.library_name;
        let extension = LibraryExtension::for_os(&self.config.target_os);
        if !extension.is_known() {
            return Err(ResolutionError::UnsupportedPlatform {
                os: self.config.target_os.clone(),
                library: name.clone(),
                source: system_err,
            });
        }

        let extractor = Extractor::new(&self.config.temp_dir);
        let path = extractor
            .extract(self.config.resources.as_ref(), name, extension)
            .map_err(|source| ResolutionError::Extraction {
                resource: resource_name(name, extension),
                source,
            })?;

        match self.linker.open_path(&path) {
            Ok(module) => {
                tracing::info!("Loaded bundled connector binding from {}", path.display());
                extractor.release(&path);
                Ok(module)
            }
            Err(source) => {
                extractor.discard(&path);
                Err(ResolutionError::ExtractedLoad { path, source })
            }
        }
    }
}
