//! Action plan produced by the reconciliation engine.

use std::fmt;

use serde::Serialize;

use mirror_core::ObjectKey;

/// Why a key is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadReason {
    MissingRemotely,
    LocalNewer,
}

impl fmt::Display for UploadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadReason::MissingRemotely => write!(f, "missing remotely"),
            UploadReason::LocalNewer => write!(f, "local newer"),
        }
    }
}

/// Why a key is left alone.
///
/// `RemoteTimestampUnavailable` is a conservative no-op, not proof of
/// freshness; it is kept distinct so operators can audit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UpToDate,
    RemoteTimestampUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UpToDate => write!(f, "up to date"),
            SkipReason::RemoteTimestampUnavailable => write!(f, "remote timestamp unavailable"),
        }
    }
}

/// One decision for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Upload { key: ObjectKey, reason: UploadReason },
    Skip { key: ObjectKey, reason: SkipReason },
    Delete { key: ObjectKey },
}

impl Action {
    pub fn key(&self) -> &ObjectKey {
        match self {
            Action::Upload { key, .. } | Action::Skip { key, .. } | Action::Delete { key } => key,
        }
    }

    /// Human-readable rationale.
    pub fn reason(&self) -> String {
        match self {
            Action::Upload { reason, .. } => reason.to_string(),
            Action::Skip { reason, .. } => reason.to_string(),
            Action::Delete { .. } => "absent locally".to_string(),
        }
    }

    /// Short verb: `upload`, `skip` or `delete`.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Upload { .. } => "upload",
            Action::Skip { .. } => "skip",
            Action::Delete { .. } => "delete",
        }
    }

    /// Whether executing the action touches the store.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Action::Skip { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind(), self.key(), self.reason())
    }
}

/// Counts per action kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub uploads: usize,
    pub skips: usize,
    pub deletes: usize,
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.uploads + self.skips + self.deletes
    }
}

/// Ordered list of actions for one run: uploads and skips first, then deletes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActionPlan {
    actions: Vec<Action>,
}

impl ActionPlan {
    pub(crate) fn from_actions(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// True when executing the plan would not change the store.
    pub fn is_noop(&self) -> bool {
        self.actions.iter().all(|a| !a.is_mutation())
    }

    pub fn uploads(&self) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Upload { .. }))
    }

    pub fn skips(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| matches!(a, Action::Skip { .. }))
    }

    pub fn deletes(&self) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Delete { .. }))
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for action in &self.actions {
            match action {
                Action::Upload { .. } => summary.uploads += 1,
                Action::Skip { .. } => summary.skips += 1,
                Action::Delete { .. } => summary.deletes += 1,
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a ActionPlan {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_render_as_operator_text() {
        let upload = Action::Upload {
            key: ObjectKey::from("a/x.txt"),
            reason: UploadReason::MissingRemotely,
        };
        let skip = Action::Skip {
            key: ObjectKey::from("a/x.txt"),
            reason: SkipReason::RemoteTimestampUnavailable,
        };
        let delete = Action::Delete {
            key: ObjectKey::from("a/old.txt"),
        };
        assert_eq!(upload.to_string(), "upload a/x.txt (missing remotely)");
        assert_eq!(skip.reason(), "remote timestamp unavailable");
        assert_eq!(delete.reason(), "absent locally");
        assert_eq!(UploadReason::LocalNewer.to_string(), "local newer");
        assert_eq!(SkipReason::UpToDate.to_string(), "up to date");
    }

    #[test]
    fn summary_counts_each_kind() {
        let plan = ActionPlan::from_actions(vec![
            Action::Upload {
                key: ObjectKey::from("a"),
                reason: UploadReason::LocalNewer,
            },
            Action::Skip {
                key: ObjectKey::from("b"),
                reason: SkipReason::UpToDate,
            },
            Action::Delete {
                key: ObjectKey::from("c"),
            },
        ]);
        let summary = plan.summary();
        assert_eq!((summary.uploads, summary.skips, summary.deletes), (1, 1, 1));
        assert_eq!(summary.total(), 3);
        assert!(!plan.is_noop());
    }

    #[test]
    fn skip_only_plan_is_noop() {
        let plan = ActionPlan::from_actions(vec![Action::Skip {
            key: ObjectKey::from("a"),
            reason: SkipReason::UpToDate,
        }]);
        assert!(plan.is_noop());
        assert!(ActionPlan::default().is_noop());
    }

    #[test]
    fn actions_serialize_with_tag() {
        let action = Action::Upload {
            key: ObjectKey::from("a/x.txt"),
            reason: UploadReason::LocalNewer,
        };
        let json = serde_json::to_value(&action).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"action": "upload", "key": "a/x.txt", "reason": "local_newer"})
        );
    }
}
