use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server-side notification entry (new order placed, status changed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Count of unread entries, for UI badges.
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}
