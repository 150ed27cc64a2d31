use chrono::{DateTime, Utc};
use redops_common::id::prefix;
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::operation::OperationPhase;
use super::Document;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: String,
    pub operation_id: String,
    pub title: String,
    pub description: String,
    pub assigned_to: Option<String>,
    pub status: TaskStatus,
    pub phase: OperationPhase,
    pub mitre_id: String,
    pub owasp_id: String,
    /// Free-text findings summary; structured rows live in the results collection.
    pub results: String,
    pub tools: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrefixedId for Task {
    const PREFIX: &'static str = prefix::TASK;
}

impl Document for Task {
    const COLLECTION: &'static str = "tasks";

    fn id(&self) -> &str {
        &self.id
    }
}
