//! Cursor types for incremental harvesting.
//!
//! Harvesting progress is tracked with opaque position markers. Older
//! upstream sources only understand timestamps, newer ones hand out
//! sequence numbers which do not lose updates that share a timestamp.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Cursor scheme spoken by the upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestMode {
    /// Not yet determined; the next fetch doubles as a capability probe
    #[default]
    Unknown,
    /// Opaque timestamp cursors
    Timestamp,
    /// Opaque sequence number cursors
    Sequence,
}

impl HarvestMode {
    /// Whether the mode has been determined.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, HarvestMode::Unknown)
    }
}

impl std::fmt::Display for HarvestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarvestMode::Unknown => write!(f, "unknown"),
            HarvestMode::Timestamp => write!(f, "timestamp"),
            HarvestMode::Sequence => write!(f, "sequence"),
        }
    }
}

/// A position to harvest from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cursor {
    /// Harvest records changed since this timestamp
    Timestamp(String),
    /// Harvest records starting at this sequence number
    Sequence(String),
}

impl Cursor {
    /// The opaque cursor string.
    pub fn value(&self) -> &str {
        match self {
            Cursor::Timestamp(v) | Cursor::Sequence(v) => v,
        }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cursor::Timestamp(v) => write!(f, "from={}", v),
            Cursor::Sequence(v) => write!(f, "seq={}", v),
        }
    }
}

/// Operator-supplied starting point (`-t` or `-q`).
///
/// Only honoured on a target's first successful pass in a process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartCursor {
    /// Explicit start timestamp
    Timestamp(String),
    /// Explicit start sequence number
    Sequence(String),
}

impl StartCursor {
    /// Build from the two mutually exclusive command-line values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConflictingStartCursors` when both are given.
    pub fn from_flags(
        timestamp: Option<String>,
        sequence: Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        match (timestamp, sequence) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingStartCursors),
            (Some(ts), None) => Ok(Some(StartCursor::Timestamp(ts))),
            (None, Some(seq)) => Ok(Some(StartCursor::Sequence(seq))),
            (None, None) => Ok(None),
        }
    }

    /// The mode this explicit cursor pins the run to.
    pub fn mode(&self) -> HarvestMode {
        match self {
            StartCursor::Timestamp(_) => HarvestMode::Timestamp,
            StartCursor::Sequence(_) => HarvestMode::Sequence,
        }
    }

    /// Convert into a fetch cursor.
    pub fn to_cursor(&self) -> Cursor {
        match self {
            StartCursor::Timestamp(ts) => Cursor::Timestamp(ts.clone()),
            StartCursor::Sequence(seq) => Cursor::Sequence(seq.clone()),
        }
    }
}

/// Cursor values reported by a harvest response.
///
/// The timestamp is the response date; the sequence is the next sequence
/// number to request, present only when the source supports sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
}

impl ResponseCursor {
    /// Overlay values from a later page; absent values keep the earlier ones.
    pub fn merge(&mut self, later: &ResponseCursor) {
        if later.timestamp.is_some() {
            self.timestamp = later.timestamp.clone();
        }
        if later.sequence.is_some() {
            self.sequence = later.sequence.clone();
        }
    }
}
