//! Change records and harvest responses.

use serde::{Deserialize, Serialize};

use crate::cursor::ResponseCursor;

/// What happened to the upstream record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    /// Created or modified
    #[default]
    Update,
    /// Removed upstream
    Delete,
}

/// One change event harvested from the upstream repository.
///
/// Carries either the full content or just enough to be re-fetched
/// individually when the indexer asks for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Upstream identifier, also the dedupe key downstream
    pub record_id: String,

    #[serde(default)]
    pub action: RecordAction,

    /// Human readable title, used in logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Upstream modification timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Full content, absent when only a summary was harvested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl UpdateRecord {
    /// Record with full content.
    pub fn update(record_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            action: RecordAction::Update,
            title: None,
            timestamp: None,
            content: Some(content.into()),
        }
    }

    /// Record referencing upstream content without carrying it.
    pub fn summary(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            action: RecordAction::Update,
            title: None,
            timestamp: None,
            content: None,
        }
    }

    /// Deletion marker.
    pub fn delete(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            action: RecordAction::Delete,
            title: None,
            timestamp: None,
            content: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

}

impl std::fmt::Display for UpdateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self.action {
            RecordAction::Update => "update",
            RecordAction::Delete => "delete",
        };
        match &self.title {
            Some(title) => write!(f, "{} [{}] {}", action, self.record_id, title),
            None => write!(f, "{} [{}]", action, self.record_id),
        }
    }
}

/// One harvester round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestPage {
    /// Records in this page
    #[serde(default)]
    pub records: Vec<UpdateRecord>,

    /// Continuation token; present while the response has more pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumption_token: Option<String>,

    /// Cursor values reported with this page
    #[serde(default)]
    pub cursor: ResponseCursor,

    /// Whether the source reported sequence numbers for this response
    #[serde(default)]
    pub supports_sequence: bool,
}

impl HarvestPage {
    /// Whether more pages follow this one.
    pub fn has_more(&self) -> bool {
        self.resumption_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_display() {
        let record = UpdateRecord::update("42", "body").with_title("Main Page");
        assert_eq!(record.to_string(), "update [42] Main Page");
        assert_eq!(UpdateRecord::delete("7").to_string(), "delete [7]");
    }

    #[test]
    fn test_summary_record_has_no_content() {
        assert!(UpdateRecord::summary("1").content.is_none());
        assert_eq!(UpdateRecord::update("1", "x").content.as_deref(), Some("x"));
    }

    #[test]
    fn test_page_deserializes_with_defaults() {
        let page: HarvestPage = serde_json::from_str(
            r#"{"records":[{"record_id":"1"}],"cursor":{"timestamp":"2024-01-01"}}"#,
        )
        .unwrap();

        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].action, RecordAction::Update);
        assert!(!page.has_more());
        assert!(!page.supports_sequence);
        assert_eq!(page.cursor.timestamp.as_deref(), Some("2024-01-01"));
    }
}
