//! Error types for configr.

use std::sync::Arc;

/// Result type alias for configr operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while resolving or aggregating configuration.
///
/// `ConfigError` is `Clone` so that a single failed resolution can be handed
/// to every caller waiting on it (see [`crate::core::ConfigCache`]).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A required location could not be found.
    #[error("location={location} not found")]
    NotFound {
        /// File path or URL that was required to exist
        location: String,
    },

    /// No source with the given identity is registered.
    #[error("source={identity} not found")]
    SourceNotFound {
        /// Name or location used for the lookup
        identity: String,
    },

    /// An HTTP fetch returned a non-success, non-404 status.
    #[error("error encountered fetching url={location}: code={status}")]
    HttpStatus {
        /// URL that was fetched
        location: String,
        /// HTTP status code
        status: u16,
    },

    /// The HTTP request itself failed (connection, TLS, body read).
    #[error("HTTP request to url={location} failed: {message}")]
    Transport {
        /// URL that was fetched
        location: String,
        /// Underlying failure
        message: String,
    },

    /// IO error other than a missing file.
    #[error("IO error reading path={location}: {source}")]
    Io {
        /// Path that was read
        location: String,
        /// Underlying IO error
        source: Arc<std::io::Error>,
    },

    /// The format tag is not one of yaml, yml or json.
    #[error("unhandled type={format}")]
    UnsupportedFormat {
        /// Offending format tag
        format: String,
    },

    /// Content could not be decoded in its format.
    #[error("Failed to parse configuration from {location}: {message}")]
    Decode {
        /// Location (or format tag) of the content
        location: String,
        /// Parser message
        message: String,
    },

    /// A module could not be loaded or its invocation failed.
    #[error("module={reference} failed: {message}")]
    Module {
        /// Module reference as given in the descriptor
        reference: String,
        /// Failure description
        message: String,
    },

    /// A source with the same identity already exists.
    #[error("source={identity} already exists")]
    Conflict {
        /// Conflicting identity key
        identity: String,
    },

    /// A source descriptor is malformed.
    #[error("Invalid source descriptor: {0}")]
    InvalidDescriptor(String),

    /// An environment variable is missing or holds an unusable value.
    #[error("environment-variable={name}: {message}")]
    Env {
        /// Variable name
        name: String,
        /// What was wrong with it
        message: String,
    },

    /// Failed to deserialize the merged configuration.
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),

    /// Attempted to use a feature that is not enabled.
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(&'static str),

    /// File watching failed to initialize.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// Resolution of a particular source failed.
    #[error("failed to resolve source={identity}: {error}")]
    Source {
        /// Identity of the failing source
        identity: String,
        /// Cause
        #[source]
        error: Box<ConfigError>,
    },

    /// Generic error for other cases.
    #[error("Configuration error: {0}")]
    Other(String),
}

/// Coarse classification of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required data or a looked-up source is missing.
    NotFound,
    /// HTTP or filesystem failure other than absence.
    Transport,
    /// Unsupported format or malformed content.
    Decode,
    /// Module load or invocation failure.
    Module,
    /// Duplicate source identity.
    Conflict,
    /// Invalid input, environment or other usage error.
    Config,
}

impl ConfigError {
    /// Classify this error, looking through [`ConfigError::Source`] wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::SourceNotFound { .. } => ErrorKind::NotFound,
            Self::HttpStatus { .. } | Self::Transport { .. } | Self::Io { .. } => {
                ErrorKind::Transport
            }
            Self::UnsupportedFormat { .. } | Self::Decode { .. } => ErrorKind::Decode,
            Self::Module { .. } => ErrorKind::Module,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Source { error, .. } => error.kind(),
            Self::InvalidDescriptor(_)
            | Self::Env { .. }
            | Self::DeserializationError(_)
            | Self::FeatureNotEnabled(_)
            | Self::WatchError(_)
            | Self::Other(_) => ErrorKind::Config,
        }
    }

    /// Returns the innermost error, skipping [`ConfigError::Source`] wrappers.
    pub fn root(&self) -> &ConfigError {
        match self {
            Self::Source { error, .. } => error.root(),
            other => other,
        }
    }

    pub(crate) fn module(reference: impl Into<String>, message: impl ToString) -> Self {
        Self::Module {
            reference: reference.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn env(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Env {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn in_source(self, identity: impl Into<String>) -> Self {
        Self::Source {
            identity: identity.into(),
            error: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_looks_through_source_wrapper() {
        let err = ConfigError::NotFound {
            location: "nope/nope.yaml".to_string(),
        }
        .in_source("nope/nope.yaml");

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err.root(), ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("nope/nope.yaml"));
    }

    #[test]
    fn test_kinds() {
        let status = ConfigError::HttpStatus {
            location: "https://example.com/a.yaml".to_string(),
            status: 500,
        };
        assert_eq!(status.kind(), ErrorKind::Transport);
        assert!(status.to_string().contains("code=500"));

        let format = ConfigError::UnsupportedFormat {
            format: "properties".to_string(),
        };
        assert_eq!(format.kind(), ErrorKind::Decode);

        assert_eq!(
            ConfigError::module("get-config", "boom").kind(),
            ErrorKind::Module
        );
        assert_eq!(
            ConfigError::Conflict {
                identity: "a".to_string()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(ConfigError::env("HOME", "bad").kind(), ErrorKind::Config);
    }

    #[test]
    fn test_io_error_is_clone() {
        let err = ConfigError::Io {
            location: "/etc/shadow".to_string(),
            source: Arc::new(std::io::Error::from(std::io::ErrorKind::PermissionDenied)),
        };
        let cloned = err.clone();
        assert_eq!(cloned.kind(), ErrorKind::Transport);
        assert!(std::error::Error::source(&cloned).is_some());
    }
}
