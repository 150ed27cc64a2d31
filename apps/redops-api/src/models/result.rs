use chrono::{DateTime, Utc};
use redops_common::id::prefix;
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Document;

/// One row of an engagement log, as exported from the operators' spreadsheet.
/// All columns are free text and optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(rename = "sourceIP", default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(rename = "destinationIP", default, skip_serializing_if = "Option::is_none")]
    pub destination_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_system: Option<String>,
    #[serde(rename = "pivotIP", default, skip_serializing_if = "Option::is_none")]
    pub pivot_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_modification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
}

impl ResultRow {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: String,
    pub task_id: String,
    #[serde(flatten)]
    pub row: ResultRow,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrefixedId for TaskResult {
    const PREFIX: &'static str = prefix::RESULT;
}

impl Document for TaskResult {
    const COLLECTION: &'static str = "results";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn columns_use_spreadsheet_names() {
        let row: ResultRow = serde_json::from_value(json!({
            "sourceIP": "10.0.0.5",
            "destinationPort": "445",
            "toolApp": "impacket",
            "operatorName": "kim"
        }))
        .unwrap();
        assert_eq!(row.source_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(row.tool_app.as_deref(), Some("impacket"));

        let stored = TaskResult {
            id: "res_1".into(),
            task_id: "tsk_1".into(),
            row,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["taskId"], "tsk_1");
        assert_eq!(value["destinationPort"], "445");
        assert!(value.get("comments").is_none());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn blank_row_is_empty() {
        assert!(ResultRow::default().is_empty());
        let row: ResultRow = serde_json::from_value(json!({ "url": "http://x" })).unwrap();
        assert!(!row.is_empty());
    }
}
