//! Error types for mirror-sync.
//!
//! Only run-level failures live here. Per-action upload/delete failures are
//! [`RemoteError`]s recorded in the run report and never abort a run.

use std::path::PathBuf;

use thiserror::Error;

use mirror_core::BucketName;

/// Failure reported by a remote store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport or authentication failure while reading from the store.
    #[error("access error: {0}")]
    Access(String),

    /// The local file to upload does not exist.
    #[error("local file not found: {path}")]
    NotFound { path: PathBuf },

    /// Upload or delete request failed.
    #[error("transfer error: {0}")]
    Transfer(String),

    /// The store refused a provisioning request.
    #[error("permission error: {0}")]
    Permission(String),
}

impl RemoteError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Access(_) | RemoteError::Transfer(_))
    }
}

/// Failure of the Local Inventory Source.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("local root not found: {path}")]
    NotFound { path: PathBuf },

    #[error("local root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Fatal errors that abort a sync run before or instead of executing actions.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local tree could not be inventoried.
    #[error("local inventory failed: {0}")]
    Inventory(#[from] InventoryError),

    /// Listing keys, reading timestamps or checking the bucket failed.
    #[error("remote inventory failed for bucket '{bucket}': {source}")]
    RemoteInventory {
        bucket: BucketName,
        #[source]
        source: RemoteError,
    },

    /// The bucket is absent and creation is not allowed.
    #[error(
        "bucket '{bucket}' does not exist and creation is not allowed; \
         pass --create-bucket or set create_bucket: true"
    )]
    BucketCreationDisallowed { bucket: BucketName },

    /// The store rejected bucket creation.
    #[error("failed to create bucket '{bucket}': {source}")]
    BucketCreationFailed {
        bucket: BucketName,
        #[source]
        source: RemoteError,
    },
}

/// Convenience constructor for [`InventoryError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> InventoryError {
    InventoryError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::RemoteInventory`].
pub(crate) fn remote_inventory_err(bucket: &BucketName, source: RemoteError) -> SyncError {
    SyncError::RemoteInventory {
        bucket: bucket.clone(),
        source,
    }
}
