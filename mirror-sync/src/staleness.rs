//! Staleness policy: decides whether a remote copy is behind its local file.
//!
//! Decision table:
//! 1. remote timestamp unknown         → `RemoteUnknown` (conservative no-op)
//! 2. local modified  > remote modified → `LocalNewer`
//! 3. otherwise (equal or older)        → `UpToDate`
//!
//! Both instants are `DateTime<Utc>`; the comparison never mixes zones.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mirror_core::RemoteTimestamp;

/// Outcome of comparing one local file with its remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    LocalNewer,
    UpToDate,
    RemoteUnknown,
}

/// Compare a local modification instant with the remote last-modified state.
///
/// Strict greater-than: equal instants are up to date.
pub fn decide(local_modified: DateTime<Utc>, remote: RemoteTimestamp) -> Freshness {
    match remote {
        RemoteTimestamp::Unknown => Freshness::RemoteUnknown,
        RemoteTimestamp::At(remote_modified) if local_modified > remote_modified => {
            Freshness::LocalNewer
        }
        RemoteTimestamp::At(_) => Freshness::UpToDate,
    }
}

/// Format age from a chrono timestamp (local mtimes, remote last-modified).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let now = Utc::now();
    let age = now.signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
