//! Contracts for the object-store collaborators.
//!
//! Implementations are thin I/O wrappers. They must convert every timestamp
//! to UTC before returning it and must not retry on their own; retrying is the
//! orchestrator's job.

use std::collections::BTreeSet;
use std::path::Path;

use mirror_core::{BucketName, ObjectKey, RemoteTimestamp};

use crate::error::RemoteError;

/// Read side of the store: which keys exist and when they last changed.
pub trait RemoteInventory {
    /// Every key currently in `bucket`.
    fn list_keys(&self, bucket: &BucketName) -> Result<BTreeSet<ObjectKey>, RemoteError>;

    /// Last-modified instant of `key`, or `RemoteTimestamp::Unknown` when the
    /// store cannot report one.
    fn head_timestamp(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<RemoteTimestamp, RemoteError>;
}

/// Write side of the store.
pub trait RemoteMutator {
    fn bucket_exists(&self, bucket: &BucketName) -> Result<bool, RemoteError>;

    fn create_bucket(&self, bucket: &BucketName) -> Result<(), RemoteError>;

    /// Upload the file at `local_path` to `key`.
    ///
    /// Fails with [`RemoteError::NotFound`] if `local_path` does not exist.
    fn upload(&self, local_path: &Path, bucket: &BucketName, key: &ObjectKey)
        -> Result<(), RemoteError>;

    fn delete(&self, bucket: &BucketName, key: &ObjectKey) -> Result<(), RemoteError>;
}

/// A store that can be both inventoried and mutated.
pub trait RemoteStore: RemoteInventory + RemoteMutator {}

impl<T: RemoteInventory + RemoteMutator> RemoteStore for T {}
