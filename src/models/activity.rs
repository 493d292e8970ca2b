use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{category_of, EventType};

/// Per-user engagement counters maintained by the event tracker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserActivity {
    pub user_id: String,
    pub page_views: u64,
    pub clicks: u64,
    /// Categories seen in viewed items, in first-seen order
    pub categories: Vec<String>,
    pub last_active: DateTime<Utc>,
}

impl UserActivity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            page_views: 0,
            clicks: 0,
            categories: Vec::new(),
            last_active: Utc::now(),
        }
    }

    /// Applies one event to the counters
    pub fn record(&mut self, event_type: &EventType, item_id: &str, at: DateTime<Utc>) {
        self.last_active = at;

        match event_type {
            EventType::View => {
                self.page_views += 1;
                if let Some(category) = category_of(item_id) {
                    if !self.categories.iter().any(|c| c == category) {
                        self.categories.push(category.to_string());
                    }
                }
            }
            EventType::Click => self.clicks += 1,
            EventType::Other(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_counts_page_and_category_once() {
        let mut activity = UserActivity::new("alice");
        let now = Utc::now();
        activity.record(&EventType::View, "tech_ai_news", now);
        activity.record(&EventType::View, "tech_gadgets", now);
        activity.record(&EventType::View, "science_space", now);

        assert_eq!(activity.page_views, 3);
        assert_eq!(activity.clicks, 0);
        assert_eq!(activity.categories, vec!["tech", "science"]);
    }

    #[test]
    fn test_click_and_unknown_events() {
        let mut activity = UserActivity::new("bob");
        let now = Utc::now();
        activity.record(&EventType::Click, "tech_ai_news", now);
        activity.record(&EventType::from("like"), "tech_ai_news", now);

        assert_eq!(activity.clicks, 1);
        assert_eq!(activity.page_views, 0);
        assert!(activity.categories.is_empty());
        assert_eq!(activity.last_active, now);
    }
}
