//! Domain types shared by the inventory sources, the reconciliation engine and
//! the remote store adapters.
//!
//! Every timestamp is a `DateTime<Utc>`. Sources convert their native clock
//! values at the boundary so the engine never compares mixed representations.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Forward-slash separated relative path identifying a file locally and an
/// object remotely.
///
/// Equality is exact string equality. No case folding, separator rewriting or
/// trailing-slash trimming happens here; producers of keys own that.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(pub String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ObjectKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of the target bucket in the object store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketName(pub String);

impl BucketName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BucketName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BucketName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Last-modified instant reported by the remote store.
///
/// `Unknown` is its own state: the store answered but could not say when the
/// object changed. It is never treated as "very old".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "at")]
pub enum RemoteTimestamp {
    Unknown,
    At(DateTime<Utc>),
}

impl RemoteTimestamp {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            RemoteTimestamp::Unknown => None,
            RemoteTimestamp::At(at) => Some(*at),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, RemoteTimestamp::Unknown)
    }
}

impl From<Option<DateTime<Utc>>> for RemoteTimestamp {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(RemoteTimestamp::Unknown, RemoteTimestamp::At)
    }
}

impl fmt::Display for RemoteTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteTimestamp::Unknown => write!(f, "unknown"),
            RemoteTimestamp::At(at) => write!(f, "{}", at.to_rfc3339()),
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory entries
// ---------------------------------------------------------------------------

/// A file found under the local root at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEntry {
    pub key: ObjectKey,
    /// Absolute path of the file on disk.
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// An object present in the bucket at listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub key: ObjectKey,
    pub last_modified: RemoteTimestamp,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
