//! Reconciliation engine.
//!
//! A pure function from (local inventory, remote key set, staleness oracle) to
//! an [`ActionPlan`]. No I/O, no retained state, no failure path.
//!
//! 1. every local key, in key order: `Upload` if absent remotely, otherwise
//!    consult the oracle and apply [`staleness::decide`]
//! 2. every remote-only key, in key order: `Delete`
//!
//! Pass 1 precedes pass 2 so that a rename uploads the new key before the old
//! one disappears.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use mirror_core::{ObjectKey, RemoteTimestamp};

use crate::inventory::LocalInventory;
use crate::plan::{Action, ActionPlan, SkipReason, UploadReason};
use crate::staleness::{self, Freshness};

/// Reconcile a scanned local inventory against the remote key set.
pub fn reconcile<F>(
    local: &LocalInventory,
    remote_keys: &BTreeSet<ObjectKey>,
    oracle: F,
) -> ActionPlan
where
    F: Fn(&ObjectKey) -> RemoteTimestamp,
{
    reconcile_entries(local.modification_times(), remote_keys, oracle)
}

/// Reconcile any `(key, local modification instant)` sequence.
///
/// Duplicate local keys collapse to the last occurrence. The oracle is only
/// called for keys present on both sides.
pub fn reconcile_entries<'a, I, F>(
    local: I,
    remote_keys: &BTreeSet<ObjectKey>,
    oracle: F,
) -> ActionPlan
where
    I: IntoIterator<Item = (&'a ObjectKey, &'a DateTime<Utc>)>,
    F: Fn(&ObjectKey) -> RemoteTimestamp,
{
    let local: BTreeMap<&ObjectKey, &DateTime<Utc>> = local.into_iter().collect();
    let mut actions = Vec::with_capacity(local.len() + remote_keys.len());

    for (key, modified) in &local {
        let key = (*key).clone();
        if !remote_keys.contains(&key) {
            actions.push(Action::Upload {
                key,
                reason: UploadReason::MissingRemotely,
            });
            continue;
        }
        let action = match staleness::decide(**modified, oracle(&key)) {
            Freshness::LocalNewer => Action::Upload {
                key,
                reason: UploadReason::LocalNewer,
            },
            Freshness::UpToDate => Action::Skip {
                key,
                reason: SkipReason::UpToDate,
            },
            Freshness::RemoteUnknown => Action::Skip {
                key,
                reason: SkipReason::RemoteTimestampUnavailable,
            },
        };
        actions.push(action);
    }

    for key in remote_keys {
        if !local.contains_key(key) {
            actions.push(Action::Delete { key: key.clone() });
        }
    }

    ActionPlan::from_actions(actions)
}
