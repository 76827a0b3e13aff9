//! Typed ID wrappers for type safety across playout.
//!
//! Channels are identified by an opaque short name chosen at provisioning;
//! programmes and schedule entries use the integer row id assigned by the
//! store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a channel (its short name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Borrow the short name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the ID, returning the short name.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a programme in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgrammeId(i64);

impl ProgrammeId {
    /// Get the raw row id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ProgrammeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ProgrammeId> for i64 {
    fn from(id: ProgrammeId) -> Self {
        id.0
    }
}

impl fmt::Display for ProgrammeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(i64);

impl EntryId {
    /// Get the raw row id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<EntryId> for i64 {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
