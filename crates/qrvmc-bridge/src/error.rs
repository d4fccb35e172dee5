//! Error types for qrvmc-bridge.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::types::LoaderErrorCode;

/// Result type for qrvmc-bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in qrvmc-bridge.
///
/// Failures inside a VM (reverts, out of gas, ...) are not errors; they are
/// reported through [`ExecutionResult::status`](crate::ExecutionResult::status).
#[derive(Debug, Error)]
pub enum Error {
    /// The connector binding could not be resolved for this process.
    #[error("QRVMC binding library failed to load: {0}")]
    LoaderUnavailable(#[source] Arc<ResolutionError>),

    /// The binding is loaded but the requested VM could not be created or configured.
    #[error("{message}")]
    Creation {
        code: LoaderErrorCode,
        message: String,
    },

    /// The native module returned data that breaks the ABI contract.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The caller used an instance in a way the contract forbids.
    #[error("usage error: {0}")]
    Usage(String),
}

impl Error {
    pub(crate) fn creation(code: LoaderErrorCode, message: impl Into<String>) -> Self {
        Self::Creation {
            code,
            message: message.into(),
        }
    }

    /// Loader error code of a [`Creation`](Self::Creation) error.
    pub fn loader_code(&self) -> Option<LoaderErrorCode> {
        match self {
            Self::Creation { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Why the connector binding could not be loaded. Recorded once per resolver.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// System load failed and no extension is known for the running OS.
    #[error("cannot load '{library}' and platform '{os}' is not supported: {source}")]
    UnsupportedPlatform {
        os: String,
        library: String,
        #[source]
        source: LinkError,
    },

    /// Copying the bundled binary to a temporary file failed.
    #[error("failed to extract bundled resource '{resource}': {source}")]
    Extraction {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// The extracted binary could not be loaded.
    #[error("failed to load extracted library {}: {source}", path.display())]
    ExtractedLoad {
        path: PathBuf,
        #[source]
        source: LinkError,
    },
}

/// A dynamic linking failure, flattened to its message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LinkError(pub String);

impl From<libloading::Error> for LinkError {
    fn from(err: libloading::Error) -> Self {
        Self(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_loader_unavailable_keeps_cause() {
        let cause = Arc::new(ResolutionError::UnsupportedPlatform {
            os: "plan9".to_string(),
            library: "qrvmc".to_string(),
            source: LinkError("libqrvmc.so: cannot open shared object file".to_string()),
        });
        let err = Error::LoaderUnavailable(cause.clone());

        assert!(err.to_string().starts_with("QRVMC binding library failed to load"));
        assert!(err.to_string().contains("plan9"));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), cause.to_string());
    }

    #[test]
    fn test_creation_message_is_verbatim() {
        let err = Error::creation(
            LoaderErrorCode::InvalidOptionName,
            "vm (x) does not support any options",
        );
        assert_eq!(err.to_string(), "vm (x) does not support any options");
        assert_eq!(err.loader_code(), Some(LoaderErrorCode::InvalidOptionName));
        assert_eq!(Error::Usage("x".into()).loader_code(), None);
    }
}
