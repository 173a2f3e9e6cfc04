//! Mirror core library: domain types, configuration and errors.
//!
//! Public API surface:
//! - [`types`]: keys, timestamps and inventory entries
//! - [`config`]: config file, overrides and environment credentials
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigFile, ConfigOverrides, Credentials, MirrorConfig, RetrySettings};
pub use error::ConfigError;
pub use types::{BucketName, LocalEntry, ObjectKey, RemoteEntry, RemoteTimestamp};
