//! Error types for mirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading and resolving configuration.
///
/// These are fatal and are reported before any request reaches the store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },

    /// YAML parse error; serde_yaml supplies line/column context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// One or more required settings were not supplied by any source.
    #[error("missing required configuration: {}", .fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },

    /// A supplied value is present but unusable.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
