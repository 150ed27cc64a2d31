use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use redops_common::id::prefix;
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    Reconnaissance,
    Vulnerability,
    Exploitation,
    PostExploitation,
}

/// A catalogued offensive tool and how to invoke it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tool {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ToolType,
    pub description: String,
    pub command: String,
    pub arguments: BTreeMap<String, String>,
    pub output_format: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrefixedId for Tool {
    const PREFIX: &'static str = prefix::TOOL;
}

impl Document for Tool {
    const COLLECTION: &'static str = "tools";

    fn id(&self) -> &str {
        &self.id
    }
}
