//! # mirror-sync
//!
//! One-way reconciliation of a local directory tree into an object-store
//! bucket.
//!
//! Call [`pipeline::plan`] to compute the [`ActionPlan`] for a run, or
//! [`pipeline::run`] to plan and execute it. The store is reached only through
//! the [`RemoteInventory`] and [`RemoteMutator`] traits; [`memory::MemoryStore`]
//! is an in-process implementation.

pub mod bucket;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod remote;
pub mod report;
pub mod retry;
pub mod staleness;

pub use bucket::{ensure_bucket, BucketProvisioner, BucketReady, BucketState};
pub use error::{InventoryError, RemoteError, SyncError};
pub use inventory::{scan, ExtensionFilter, LocalInventory};
pub use pipeline::{PlannedSync, SyncOptions, SyncTarget};
pub use plan::{Action, ActionPlan, PlanSummary, SkipReason, UploadReason};
pub use reconcile::{reconcile, reconcile_entries};
pub use remote::{RemoteInventory, RemoteMutator, RemoteStore};
pub use report::{
    ActionOutcome, NullReporter, OutcomeStatus, SyncReport, SyncReporter, TracingReporter,
};
pub use retry::RetryPolicy;
pub use staleness::Freshness;
