use chrono::{DateTime, Utc};
use redops_common::id::prefix;
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Document;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: String,
    /// Recipient. `None` means everyone.
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// For a broadcast notification, whether the caller has read it.
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Users who have read a broadcast notification. Stored only, never
    /// returned to clients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_by: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_broadcast(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn is_read_by(&self, user_id: &str) -> bool {
        match self.user_id {
            Some(_) => self.read,
            None => self.read_by.iter().any(|reader| reader == user_id),
        }
    }

    /// The notification as `user_id` sees it: `read` reflects that user
    /// alone and the reader list is dropped.
    pub fn viewed_by(mut self, user_id: &str) -> Self {
        self.read = self.is_read_by(user_id);
        self.read_by = Vec::new();
        self
    }
}

impl PrefixedId for Notification {
    const PREFIX: &'static str = prefix::NOTIFICATION;
}

impl Document for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }
}
