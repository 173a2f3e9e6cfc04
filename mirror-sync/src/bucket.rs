//! Bucket provisioning state machine.
//!
//! ```text
//! NotChecked → Checking ─┬─ Exists
//!                        └─ Absent ─┬─ (creation disallowed) → fatal
//!                                   └─ Creating ─┬─ Created
//!                                                └─ CreationFailed → fatal
//! ```
//!
//! A failed existence check returns to `NotChecked` and is reported as a
//! remote inventory error.

use serde::Serialize;

use mirror_core::BucketName;

use crate::error::{remote_inventory_err, SyncError};
use crate::remote::RemoteMutator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketState {
    NotChecked,
    Checking,
    Exists,
    Absent,
    Creating,
    Created,
    CreationFailed,
}

/// Successful terminal state of provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketReady {
    Existing,
    Created,
}

/// Drives one bucket through [`BucketState`] and records every transition.
pub struct BucketProvisioner<'a, M: RemoteMutator + ?Sized> {
    remote: &'a M,
    bucket: &'a BucketName,
    create_if_absent: bool,
    state: BucketState,
    transitions: Vec<BucketState>,
}

impl<'a, M: RemoteMutator + ?Sized> BucketProvisioner<'a, M> {
    pub fn new(remote: &'a M, bucket: &'a BucketName, create_if_absent: bool) -> Self {
        Self {
            remote,
            bucket,
            create_if_absent,
            state: BucketState::NotChecked,
            transitions: vec![BucketState::NotChecked],
        }
    }

    pub fn state(&self) -> BucketState {
        self.state
    }

    /// Every state visited so far, starting with `NotChecked`.
    pub fn transitions(&self) -> &[BucketState] {
        &self.transitions
    }

    /// Run the machine until it reaches a terminal state.
    ///
    /// Idempotent once the bucket is known to exist.
    pub fn ensure(&mut self) -> Result<BucketReady, SyncError> {
        match self.state {
            BucketState::Exists => return Ok(BucketReady::Existing),
            BucketState::Created => return Ok(BucketReady::Created),
            _ => {}
        }

        self.transition(BucketState::Checking);
        let exists = match self.remote.bucket_exists(self.bucket) {
            Ok(exists) => exists,
            Err(err) => {
                self.transition(BucketState::NotChecked);
                return Err(remote_inventory_err(self.bucket, err));
            }
        };
        if exists {
            self.transition(BucketState::Exists);
            return Ok(BucketReady::Existing);
        }

        self.transition(BucketState::Absent);
        if !self.create_if_absent {
            return Err(SyncError::BucketCreationDisallowed {
                bucket: self.bucket.clone(),
            });
        }

        self.transition(BucketState::Creating);
        match self.remote.create_bucket(self.bucket) {
            Ok(()) => {
                self.transition(BucketState::Created);
                tracing::info!(bucket = %self.bucket, "created bucket");
                Ok(BucketReady::Created)
            }
            Err(source) => {
                self.transition(BucketState::CreationFailed);
                Err(SyncError::BucketCreationFailed {
                    bucket: self.bucket.clone(),
                    source,
                })
            }
        }
    }

    fn transition(&mut self, next: BucketState) {
        tracing::debug!(bucket = %self.bucket, from = ?self.state, to = ?next, "bucket state");
        self.state = next;
        self.transitions.push(next);
    }
}

/// Make sure `bucket` exists, creating it when absent and permitted.
pub fn ensure_bucket<M: RemoteMutator + ?Sized>(
    remote: &M,
    bucket: &BucketName,
    create_if_absent: bool,
) -> Result<BucketReady, SyncError> {
    BucketProvisioner::new(remote, bucket, create_if_absent).ensure()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, RemoteCall};
    use super::BucketState::*;

    fn bucket() -> BucketName {
        BucketName::from("mirror")
    }

    #[test]
    fn existing_bucket_is_not_recreated() {
        let store = MemoryStore::new().with_bucket(&bucket());
        let name = bucket();
        let mut provisioner = BucketProvisioner::new(&store, &name, true);
        assert_eq!(provisioner.ensure().expect("ensure"), BucketReady::Existing);
        assert_eq!(provisioner.transitions(), &[NotChecked, Checking, Exists]);
        assert_eq!(store.journal(), vec![RemoteCall::BucketExists(bucket())]);
    }

    #[test]
    fn absent_bucket_created_when_allowed() {
        let store = MemoryStore::new();
        let name = bucket();
        let mut provisioner = BucketProvisioner::new(&store, &name, true);
        assert_eq!(provisioner.ensure().expect("ensure"), BucketReady::Created);
        assert_eq!(
            provisioner.transitions(),
            &[NotChecked, Checking, Absent, Creating, Created]
        );
        assert!(store.has_bucket(&bucket()));
    }

    #[test]
    fn absent_bucket_fails_when_creation_disallowed() {
        let store = MemoryStore::new();
        let name = bucket();
        let mut provisioner = BucketProvisioner::new(&store, &name, false);
        let err = provisioner.ensure().unwrap_err();
        assert!(matches!(err, SyncError::BucketCreationDisallowed { .. }));
        assert_eq!(provisioner.state(), Absent);
        assert!(!store.has_bucket(&bucket()));
        assert!(err.to_string().contains("--create-bucket"));
    }

    #[test]
    fn creation_failure_is_fatal() {
        let store = MemoryStore::new();
        store.fail_bucket_creation();
        let err = ensure_bucket(&store, &bucket(), true).unwrap_err();
        assert!(matches!(err, SyncError::BucketCreationFailed { .. }));
    }

    #[test]
    fn ensure_is_idempotent_after_success() {
        let store = MemoryStore::new();
        let name = bucket();
        let mut provisioner = BucketProvisioner::new(&store, &name, true);
        provisioner.ensure().expect("first");
        store.clear_journal();
        assert_eq!(provisioner.ensure().expect("second"), BucketReady::Created);
        assert!(store.journal().is_empty());
    }
}
