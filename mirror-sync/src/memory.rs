//! In-process object store.
//!
//! Backs the test suites and offline experiments. Supports seeding objects
//! with chosen timestamps, forcing unknown timestamps, injecting failures and
//! inspecting the sequence of calls made against it.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use mirror_core::{BucketName, ObjectKey, RemoteTimestamp};

use crate::error::RemoteError;
use crate::remote::{RemoteInventory, RemoteMutator};

/// One object held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub last_modified: DateTime<Utc>,
}

/// A call received by the store, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    BucketExists(BucketName),
    CreateBucket(BucketName),
    ListKeys(BucketName),
    Head(ObjectKey),
    Upload(ObjectKey),
    Delete(ObjectKey),
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<BucketName, BTreeMap<ObjectKey, StoredObject>>,
    /// Fixed upload clock; `None` stamps uploads with the wall clock.
    clock: Option<DateTime<Utc>>,
    unknown_timestamps: BTreeSet<ObjectKey>,
    /// Remaining injected failures per key.
    failing_uploads: BTreeMap<ObjectKey, u32>,
    failing_deletes: BTreeMap<ObjectKey, u32>,
    fail_listing: bool,
    fail_heads: bool,
    fail_bucket_creation: bool,
    journal: Vec<RemoteCall>,
}

/// `RefCell`-backed store; single-threaded like the orchestrator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `bucket` up front.
    pub fn with_bucket(self, bucket: &BucketName) -> Self {
        self.state
            .borrow_mut()
            .buckets
            .entry(bucket.clone())
            .or_default();
        self
    }

    /// Seed an object, creating the bucket if needed.
    pub fn put_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        content: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) {
        self.state
            .borrow_mut()
            .buckets
            .entry(bucket.clone())
            .or_default()
            .insert(
                key.clone(),
                StoredObject {
                    content: content.into(),
                    last_modified,
                },
            );
    }

    /// Stamp subsequent uploads starting at `at`, one second apart.
    pub fn set_clock(&self, at: DateTime<Utc>) {
        self.state.borrow_mut().clock = Some(at);
    }

    /// Report `RemoteTimestamp::Unknown` for `key`.
    pub fn mark_timestamp_unknown(&self, key: &ObjectKey) {
        self.state.borrow_mut().unknown_timestamps.insert(key.clone());
    }

    /// Fail the next `times` uploads of `key` with a transfer error.
    pub fn fail_uploads_for(&self, key: &ObjectKey, times: u32) {
        self.state
            .borrow_mut()
            .failing_uploads
            .insert(key.clone(), times);
    }

    /// Fail the next `times` deletes of `key` with a transfer error.
    pub fn fail_deletes_for(&self, key: &ObjectKey, times: u32) {
        self.state
            .borrow_mut()
            .failing_deletes
            .insert(key.clone(), times);
    }

    pub fn fail_listing(&self) {
        self.state.borrow_mut().fail_listing = true;
    }

    pub fn fail_heads(&self) {
        self.state.borrow_mut().fail_heads = true;
    }

    pub fn fail_bucket_creation(&self) {
        self.state.borrow_mut().fail_bucket_creation = true;
    }

    pub fn has_bucket(&self, bucket: &BucketName) -> bool {
        self.state.borrow().buckets.contains_key(bucket)
    }

    /// Keys in `bucket`, sorted. Empty if the bucket does not exist.
    pub fn keys(&self, bucket: &BucketName) -> Vec<ObjectKey> {
        self.state
            .borrow()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &BucketName, key: &ObjectKey) -> Option<StoredObject> {
        self.state
            .borrow()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn journal(&self) -> Vec<RemoteCall> {
        self.state.borrow().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.borrow_mut().journal.clear();
    }

    fn record(&self, call: RemoteCall) {
        self.state.borrow_mut().journal.push(call);
    }

    fn next_stamp(state: &mut State) -> DateTime<Utc> {
        match state.clock {
            Some(at) => {
                state.clock = Some(at + Duration::seconds(1));
                at
            }
            None => Utc::now(),
        }
    }
}

/// Consume one injected failure for `key`, if any remain.
fn take_failure(failures: &mut BTreeMap<ObjectKey, u32>, key: &ObjectKey) -> bool {
    match failures.get_mut(key) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

impl RemoteInventory for MemoryStore {
    fn list_keys(&self, bucket: &BucketName) -> Result<BTreeSet<ObjectKey>, RemoteError> {
        self.record(RemoteCall::ListKeys(bucket.clone()));
        let state = self.state.borrow();
        if state.fail_listing {
            return Err(RemoteError::Access("listing denied".to_string()));
        }
        state
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .ok_or_else(|| RemoteError::Access(format!("no such bucket: {bucket}")))
    }

    fn head_timestamp(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<RemoteTimestamp, RemoteError> {
        self.record(RemoteCall::Head(key.clone()));
        let state = self.state.borrow();
        if state.fail_heads {
            return Err(RemoteError::Access("head request denied".to_string()));
        }
        if state.unknown_timestamps.contains(key) {
            return Ok(RemoteTimestamp::Unknown);
        }
        let object = state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| RemoteError::Access(format!("no such key: {key}")))?;
        Ok(RemoteTimestamp::At(object.last_modified))
    }
}

impl RemoteMutator for MemoryStore {
    fn bucket_exists(&self, bucket: &BucketName) -> Result<bool, RemoteError> {
        self.record(RemoteCall::BucketExists(bucket.clone()));
        Ok(self.has_bucket(bucket))
    }

    fn create_bucket(&self, bucket: &BucketName) -> Result<(), RemoteError> {
        self.record(RemoteCall::CreateBucket(bucket.clone()));
        let mut state = self.state.borrow_mut();
        if state.fail_bucket_creation {
            return Err(RemoteError::Permission("bucket creation denied".to_string()));
        }
        state.buckets.entry(bucket.clone()).or_default();
        Ok(())
    }

    fn upload(
        &self,
        local_path: &Path,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> Result<(), RemoteError> {
        self.record(RemoteCall::Upload(key.clone()));
        if !local_path.exists() {
            return Err(RemoteError::NotFound {
                path: local_path.to_path_buf(),
            });
        }
        let mut state = self.state.borrow_mut();
        if take_failure(&mut state.failing_uploads, key) {
            return Err(RemoteError::Transfer(format!("injected upload failure for {key}")));
        }
        let content = std::fs::read(local_path)
            .map_err(|e| RemoteError::Transfer(format!("{}: {e}", local_path.display())))?;
        let last_modified = Self::next_stamp(&mut state);
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| RemoteError::Transfer(format!("no such bucket: {bucket}")))?;
        objects.insert(
            key.clone(),
            StoredObject {
                content,
                last_modified,
            },
        );
        state.unknown_timestamps.remove(key);
        Ok(())
    }

    fn delete(&self, bucket: &BucketName, key: &ObjectKey) -> Result<(), RemoteError> {
        self.record(RemoteCall::Delete(key.clone()));
        let mut state = self.state.borrow_mut();
        if take_failure(&mut state.failing_deletes, key) {
            return Err(RemoteError::Transfer(format!("injected delete failure for {key}")));
        }
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| RemoteError::Transfer(format!("no such bucket: {bucket}")))?;
        objects.remove(key);
        Ok(())
    }
}
