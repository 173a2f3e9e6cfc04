//! Sync orchestrator shared by `mirror plan` and `mirror sync`.
//!
//! 1. Scan the local tree (fatal on error, before any store request).
//! 2. Ensure the bucket exists, creating it when allowed.
//! 3. List remote keys and read timestamps for keys present on both sides.
//! 4. Reconcile into an [`ActionPlan`].
//! 5. (`run` only) execute actions in plan order; failures are recorded and
//!    the batch continues.

use std::path::PathBuf;

use chrono::Utc;

use mirror_core::{BucketName, MirrorConfig, ObjectKey, RemoteEntry, RemoteTimestamp};

use crate::bucket::{ensure_bucket, BucketReady};
use crate::error::{remote_inventory_err, RemoteError, SyncError};
use crate::inventory::{self, ExtensionFilter, LocalInventory};
use crate::plan::{Action, ActionPlan};
use crate::reconcile::reconcile;
use crate::remote::RemoteStore;
use crate::report::{ActionOutcome, SyncReport, SyncReporter};
use crate::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Which tree is mirrored into which bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub local_root: PathBuf,
    pub bucket: BucketName,
}

impl SyncTarget {
    pub fn new(local_root: impl Into<PathBuf>, bucket: impl Into<BucketName>) -> Self {
        Self {
            local_root: local_root.into(),
            bucket: bucket.into(),
        }
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(config.local_path.clone(), config.bucket.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub create_bucket: bool,
    /// `None` mirrors every file.
    pub extensions: Option<ExtensionFilter>,
    pub retry: RetryPolicy,
}

impl SyncOptions {
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self {
            create_bucket: config.create_bucket,
            extensions: config.extensions.as_ref().map(ExtensionFilter::new),
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

/// A computed plan together with the snapshots it was derived from.
#[derive(Debug, Clone)]
pub struct PlannedSync {
    pub bucket: BucketReady,
    pub inventory: LocalInventory,
    /// Remote objects whose key is also present locally, in key order.
    pub shared: Vec<RemoteEntry>,
    pub plan: ActionPlan,
}

impl PlannedSync {
    /// Last-modified value read for `key`, if it was present on both sides.
    pub fn remote_timestamp(&self, key: &ObjectKey) -> Option<RemoteTimestamp> {
        lookup(&self.shared, key)
    }
}

fn lookup(entries: &[RemoteEntry], key: &ObjectKey) -> Option<RemoteTimestamp> {
    entries
        .binary_search_by(|entry| entry.key.cmp(key))
        .ok()
        .map(|i| entries[i].last_modified)
}

/// Compute the action plan without mutating any object.
///
/// May still create the bucket when it is absent and creation is allowed.
pub fn plan<R: RemoteStore + ?Sized>(
    remote: &R,
    target: &SyncTarget,
    options: &SyncOptions,
) -> Result<PlannedSync, SyncError> {
    let inventory = inventory::scan(&target.local_root, options.extensions.as_ref())?;
    let bucket = ensure_bucket(remote, &target.bucket, options.create_bucket)?;

    let remote_keys = remote
        .list_keys(&target.bucket)
        .map_err(|e| remote_inventory_err(&target.bucket, e))?;
    tracing::debug!(bucket = %target.bucket, keys = remote_keys.len(), "listed remote keys");

    let mut shared = Vec::new();
    for key in inventory.keys().filter(|k| remote_keys.contains(*k)) {
        let last_modified = remote
            .head_timestamp(&target.bucket, key)
            .map_err(|e| remote_inventory_err(&target.bucket, e))?;
        if last_modified.is_unknown() {
            tracing::warn!(key = %key, "remote timestamp unavailable");
        }
        shared.push(RemoteEntry {
            key: key.clone(),
            last_modified,
        });
    }

    let plan = reconcile(&inventory, &remote_keys, |key| {
        lookup(&shared, key).unwrap_or(RemoteTimestamp::Unknown)
    });

    Ok(PlannedSync {
        bucket,
        inventory,
        shared,
        plan,
    })
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Plan and execute one sync run.
///
/// Returns `Err` only for run-level failures; per-action failures land in the
/// report.
pub fn run<R, P>(
    remote: &R,
    target: &SyncTarget,
    options: &SyncOptions,
    reporter: &mut P,
) -> Result<SyncReport, SyncError>
where
    R: RemoteStore + ?Sized,
    P: SyncReporter + ?Sized,
{
    let started_at = Utc::now();
    let planned = plan(remote, target, options)?;
    reporter.plan_ready(&planned.plan);

    let outcomes = execute(remote, &target.bucket, &planned, &options.retry, reporter);

    Ok(SyncReport {
        bucket: target.bucket.clone(),
        local_root: planned.inventory.root.clone(),
        started_at,
        finished_at: Utc::now(),
        plan_summary: planned.plan.summary(),
        outcomes,
    })
}

/// Execute every action of `planned` in order.
pub fn execute<R, P>(
    remote: &R,
    bucket: &BucketName,
    planned: &PlannedSync,
    retry: &RetryPolicy,
    reporter: &mut P,
) -> Vec<ActionOutcome>
where
    R: RemoteStore + ?Sized,
    P: SyncReporter + ?Sized,
{
    let mut outcomes = Vec::with_capacity(planned.plan.len());
    for action in &planned.plan {
        reporter.action_started(action);
        let outcome = match action {
            Action::Skip { .. } => ActionOutcome::skipped(action.clone()),
            Action::Upload { key, .. } => {
                let path = planned
                    .inventory
                    .get(key)
                    .map(|entry| entry.path.clone())
                    .unwrap_or_else(|| planned.inventory.base.join(key.as_str()));
                attempt(action, retry, &mut *reporter, || remote.upload(&path, bucket, key))
            }
            Action::Delete { key } => {
                attempt(action, retry, &mut *reporter, || remote.delete(bucket, key))
            }
        };
        reporter.action_finished(&outcome);
        outcomes.push(outcome);
    }
    outcomes
}

fn attempt<P, F>(action: &Action, retry: &RetryPolicy, reporter: &mut P, op: F) -> ActionOutcome
where
    P: SyncReporter + ?Sized,
    F: FnMut() -> Result<(), RemoteError>,
{
    let attempted = retry.execute(op, |err, n, delay| {
        reporter.action_retrying(action, n, err, delay)
    });
    match attempted.result {
        Ok(()) => ActionOutcome::succeeded(action.clone(), attempted.attempts),
        Err(err) => ActionOutcome::failed(action.clone(), &err, attempted.attempts),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
