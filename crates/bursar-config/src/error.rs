//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing the configuration document itself.
///
/// These concern the file on disk, not any module's interpretation of it.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the configuration file.
    #[error("failed to write configuration file: {path}")]
    WriteError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not parseable as a YAML mapping.
    #[error("failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Creates a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new write error.
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteError {
            path: path.into(),
            source,
        }
    }
}

/// A structural configuration problem a module cannot self-repair.
///
/// Raised from a module's [`parse`](crate::ConfigModule::parse) entry point.
/// The loader catches it, archives the current document and retries every
/// module against a regenerated fail-safe document; it never surfaces past
/// the loader on that retry path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A section of the document has a shape the module cannot interpret.
    #[error("invalid config structure at `{key}`: {reason}")]
    InvalidStructure {
        /// Key path of the offending section.
        key: String,
        /// Why the structure is invalid.
        reason: String,
    },

    /// Any other unrecoverable parse problem.
    #[error("{0}")]
    Other(String),
}

impl ParseError {
    /// Creates an invalid-structure error.
    pub fn invalid_structure(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates an error from a plain message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors surfaced by [`ConfigLoader::load`](crate::ConfigLoader::load).
///
/// All variants are fatal to the caller. `Unregistered` and `TypeMismatch`
/// indicate programming errors in module registration; `FailSafeParse` means
/// a module rejected even an empty document, which aborts startup.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// The requested module is not in the registration table.
    #[error("config module `{module}` is not registered with the loader")]
    Unregistered {
        /// The module's section name.
        module: &'static str,
    },

    /// The committed config for the module has an unexpected runtime type.
    #[error("config for module `{module}` has an unexpected type")]
    TypeMismatch {
        /// The module's section name.
        module: &'static str,
    },

    /// A module failed to parse even the regenerated empty document.
    #[error("module `{module}` rejected the regenerated configuration")]
    FailSafeParse {
        /// The module's section name.
        module: String,
        /// The module's parse error.
        #[source]
        source: ParseError,
    },

    /// Filesystem failure while loading, archiving or persisting.
    #[error("configuration I/O failed at {path}: {message}")]
    Io {
        /// The path involved.
        path: String,
        /// Rendered underlying error.
        message: String,
    },

    /// The in-flight load pass was dropped before completing.
    #[error("configuration load pass was abandoned")]
    Abandoned,
}

impl LoadError {
    /// Creates an I/O error from any displayable source.
    pub fn io(path: impl AsRef<std::path::Path>, source: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::invalid_structure("commands.buy", "expected a mapping");
        assert!(err.to_string().contains("commands.buy"));
        assert!(err.to_string().contains("expected a mapping"));
    }

    #[test]
    fn test_load_error_fail_safe_chains_source() {
        let err = LoadError::FailSafeParse {
            module: "ledger".to_string(),
            source: ParseError::other("boom"),
        };
        assert!(err.to_string().contains("ledger"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn test_load_error_is_cloneable_for_broadcast() {
        let err = LoadError::io("config.yml", "disk full");
        let clone = err.clone();
        assert_eq!(err.to_string(), clone.to_string());
    }
}
