//! Per-target harvesting checkpoint.
//!
//! Read once at the start of a target's cycle and written back only after
//! the whole cycle succeeded, so a failed cycle re-harvests the same records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::{HarvestMode, ResponseCursor};

/// Durable harvesting position of one target.
///
/// The cursor matching `mode` is authoritative. The timestamp is kept in
/// sequence mode too, for debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Last response timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Next sequence number to request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,

    /// Cursor scheme this checkpoint was written under
    #[serde(default)]
    pub mode: HarvestMode,

    /// Total records dispatched under this checkpoint
    #[serde(default)]
    pub records_dispatched: u64,

    /// When the checkpoint was last written (milliseconds since epoch)
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// Checkpoint for a target with no durable record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Legacy status records carry a sequence but no mode tag.
    pub fn effective_mode(&self) -> HarvestMode {
        match self.mode {
            HarvestMode::Unknown if self.sequence.is_some() => HarvestMode::Sequence,
            mode => mode,
        }
    }

    /// Fold a completed cycle into the checkpoint.
    ///
    /// `mode` must be resolved; an unresolved mode leaves the stored one.
    pub fn advance(&mut self, mode: HarvestMode, cursor: &ResponseCursor, dispatched: u64) {
        if let Some(ts) = &cursor.timestamp {
            self.timestamp = Some(ts.clone());
        }
        if mode == HarvestMode::Sequence {
            if let Some(seq) = &cursor.sequence {
                self.sequence = Some(seq.clone());
            }
        }
        if mode.is_resolved() {
            self.mode = mode;
        }
        self.records_dispatched += dispatched;
        self.updated_at = Some(Utc::now());
    }

    /// Serialize to JSON bytes for storage
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_checkpoint_is_unknown() {
        let checkpoint = Checkpoint::new();
        assert_eq!(checkpoint.mode, HarvestMode::Unknown);
        assert!(checkpoint.timestamp.is_none());
        assert!(checkpoint.sequence.is_none());
    }

    #[test]
    fn test_advance_timestamp_mode_ignores_sequence() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.advance(
            HarvestMode::Timestamp,
            &ResponseCursor {
                timestamp: Some("2024-01-01T00:00:00".into()),
                sequence: Some("99".into()),
            },
            3,
        );

        assert_eq!(checkpoint.mode, HarvestMode::Timestamp);
        assert_eq!(checkpoint.timestamp.as_deref(), Some("2024-01-01T00:00:00"));
        assert!(checkpoint.sequence.is_none());
        assert_eq!(checkpoint.records_dispatched, 3);
        assert!(checkpoint.updated_at.is_some());
    }

    #[test]
    fn test_advance_sequence_mode_keeps_both() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.advance(
            HarvestMode::Sequence,
            &ResponseCursor {
                timestamp: Some("2024-01-01T00:00:00".into()),
                sequence: Some("1200".into()),
            },
            7,
        );
        checkpoint.advance(HarvestMode::Sequence, &ResponseCursor::default(), 1);

        assert_eq!(checkpoint.sequence.as_deref(), Some("1200"));
        assert_eq!(checkpoint.timestamp.as_deref(), Some("2024-01-01T00:00:00"));
        assert_eq!(checkpoint.records_dispatched, 8);
    }

    #[test]
    fn test_mode_never_reverts_to_unknown() {
        let mut checkpoint = Checkpoint {
            mode: HarvestMode::Sequence,
            sequence: Some("5".into()),
            ..Default::default()
        };
        checkpoint.advance(HarvestMode::Unknown, &ResponseCursor::default(), 0);
        assert_eq!(checkpoint.mode, HarvestMode::Sequence);
    }

    #[test]
    fn test_legacy_record_without_mode() {
        let checkpoint = Checkpoint::from_bytes(br#"{"timestamp":"2020-01-01","sequence":"77"}"#)
            .unwrap();
        assert_eq!(checkpoint.mode, HarvestMode::Unknown);
        assert_eq!(checkpoint.effective_mode(), HarvestMode::Sequence);
    }

    #[test]
    fn test_checkpoint_json_format() {
        let checkpoint = Checkpoint {
            timestamp: Some("2024-01-01T00:00:00".into()),
            mode: HarvestMode::Timestamp,
            ..Default::default()
        };
        let json = String::from_utf8(checkpoint.to_bytes().unwrap()).unwrap();

        assert!(json.contains("\"timestamp\": \"2024-01-01T00:00:00\""));
        assert!(json.contains("\"mode\": \"timestamp\""));
        assert!(!json.contains("\"sequence\""));
        assert!(!json.contains("\"updated_at\""));
    }
}
