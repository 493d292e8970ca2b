use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Kind of interaction a user had with an item
///
/// Only `view` and `click` feed the derived counters; any other type is
/// recorded verbatim and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    View,
    Click,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::View => "view",
            EventType::Click => "click",
            EventType::Other(kind) => kind,
        }
    }

    /// Whether the event counts towards user activity
    pub fn is_qualifying(&self) -> bool {
        matches!(self, EventType::View | EventType::Click)
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "view" => EventType::View,
            "click" => EventType::Click,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        EventType::from(value.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single user/item interaction, immutable once appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: String,
    pub item_id: String,
    pub event_type: EventType,
    pub duration_seconds: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn new(
        user_id: impl Into<String>,
        item_id: impl Into<String>,
        event_type: EventType,
        duration_seconds: Option<u32>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            event_type,
            duration_seconds,
            created_at: Utc::now(),
        }
    }

    /// Records with a blank user or item cannot take part in similarity scoring
    pub fn is_well_formed(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.item_id.trim().is_empty()
    }
}

/// Category tag encoded in an item identifier (`<category>_<rest>`)
pub fn category_of(item_id: &str) -> Option<&str> {
    match item_id.split_once('_') {
        Some((category, _)) if !category.is_empty() => Some(category),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(EventType::from("view"), EventType::View);
        assert_eq!(EventType::from("click"), EventType::Click);
        assert_eq!(
            EventType::from("like"),
            EventType::Other("like".to_string())
        );
    }

    #[test]
    fn test_event_type_serializes_as_plain_string() {
        let json = serde_json::to_string(&EventType::Other("share".to_string())).unwrap();
        assert_eq!(json, r#""share""#);

        let parsed: EventType = serde_json::from_str(r#""view""#).unwrap();
        assert_eq!(parsed, EventType::View);
    }

    #[test]
    fn test_only_view_and_click_qualify() {
        assert!(EventType::View.is_qualifying());
        assert!(EventType::Click.is_qualifying());
        assert!(!EventType::from("like").is_qualifying());
    }

    #[test]
    fn test_category_of() {
        assert_eq!(category_of("tech_ai_news"), Some("tech"));
        assert_eq!(category_of("science_space"), Some("science"));
        assert_eq!(category_of("homepage"), None);
        assert_eq!(category_of("_orphan"), None);
    }

    #[test]
    fn test_blank_identifiers_are_malformed() {
        let record = InteractionRecord::new("alice", " ", EventType::View, None);
        assert!(!record.is_well_formed());
    }
}
