//! Run outcomes and the progress sink.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use mirror_core::BucketName;

use crate::error::RemoteError;
use crate::plan::{Action, ActionPlan, PlanSummary};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Skipped,
    Failed { reason: String },
}

/// What happened to one planned action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub action: Action,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Store requests made; zero for skips.
    pub attempts: u32,
}

impl ActionOutcome {
    pub fn succeeded(action: Action, attempts: u32) -> Self {
        Self {
            action,
            status: OutcomeStatus::Succeeded,
            attempts,
        }
    }

    pub fn skipped(action: Action) -> Self {
        Self {
            action,
            status: OutcomeStatus::Skipped,
            attempts: 0,
        }
    }

    pub fn failed(action: Action, error: &RemoteError, attempts: u32) -> Self {
        Self {
            action,
            status: OutcomeStatus::Failed {
                reason: error.to_string(),
            },
            attempts,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// SyncReport
// ---------------------------------------------------------------------------

/// Everything a finished run did, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub bucket: BucketName,
    pub local_root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub plan_summary: PlanSummary,
    pub outcomes: Vec<ActionOutcome>,
}

impl SyncReport {
    fn count(&self, pred: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    pub fn uploaded(&self) -> usize {
        self.count(|o| {
            o.status == OutcomeStatus::Succeeded && matches!(o.action, Action::Upload { .. })
        })
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| {
            o.status == OutcomeStatus::Succeeded && matches!(o.action, Action::Delete { .. })
        })
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| o.status == OutcomeStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(ActionOutcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// True when no action failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

// ---------------------------------------------------------------------------
// Reporter sink
// ---------------------------------------------------------------------------

/// Receives progress events while a run executes.
///
/// Every method defaults to doing nothing.
pub trait SyncReporter {
    fn plan_ready(&mut self, _plan: &ActionPlan) {}

    fn action_started(&mut self, _action: &Action) {}

    /// `attempt` is the 1-based number of the attempt that just failed.
    fn action_retrying(
        &mut self,
        _action: &Action,
        _attempt: u32,
        _error: &RemoteError,
        _delay: Duration,
    ) {
    }

    fn action_finished(&mut self, _outcome: &ActionOutcome) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl SyncReporter for NullReporter {}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn plan_ready(&mut self, plan: &ActionPlan) {
        let summary = plan.summary();
        tracing::info!(
            uploads = summary.uploads,
            skips = summary.skips,
            deletes = summary.deletes,
            "plan ready"
        );
    }

    fn action_started(&mut self, action: &Action) {
        tracing::debug!(action = action.kind(), key = %action.key(), "starting");
    }

    fn action_retrying(
        &mut self,
        action: &Action,
        attempt: u32,
        error: &RemoteError,
        delay: Duration,
    ) {
        tracing::warn!(
            action = action.kind(),
            key = %action.key(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retrying: {error}"
        );
    }

    fn action_finished(&mut self, outcome: &ActionOutcome) {
        let action = &outcome.action;
        match &outcome.status {
            OutcomeStatus::Succeeded => tracing::info!(
                action = action.kind(),
                key = %action.key(),
                attempts = outcome.attempts,
                "{}",
                action.reason()
            ),
            OutcomeStatus::Skipped => {
                tracing::debug!(key = %action.key(), "skipped: {}", action.reason())
            }
            OutcomeStatus::Failed { reason } => tracing::error!(
                action = action.kind(),
                key = %action.key(),
                attempts = outcome.attempts,
                "failed: {reason}"
            ),
        }
    }
}
