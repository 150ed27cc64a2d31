use chrono::{DateTime, Utc};
use redops_common::id::prefix;
use redops_common::PrefixedId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::task::Task;
use super::user::UserResponse;
use super::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    RedTeam,
    PenTest,
    VulnerabilityAssessment,
}

/// Engagement phase, following the MITRE ATT&CK tactic order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationPhase {
    #[default]
    Reconnaissance,
    InitialAccess,
    Execution,
    Persistence,
    PrivilegeEscalation,
    DefenseEvasion,
    CredentialAccess,
    Discovery,
    LateralMovement,
    Collection,
    CommandAndControl,
    Exfiltration,
    Impact,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Operation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub description: String,
    pub scope: String,
    /// Rules of engagement.
    pub roe: String,
    pub team_lead: String,
    pub members: Vec<String>,
    pub current_phase: OperationPhase,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrefixedId for Operation {
    const PREFIX: &'static str = prefix::OPERATION;
}

impl Document for Operation {
    const COLLECTION: &'static str = "operations";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Operation {
    pub fn involves(&self, user_id: &str) -> bool {
        self.team_lead == user_id || self.members.iter().any(|m| m == user_id)
    }
}

/// An operation with its people and tasks resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct OperationDetail {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub description: String,
    pub scope: String,
    pub roe: String,
    /// `None` if the team lead account no longer exists.
    pub team_lead: Option<UserResponse>,
    pub members: Vec<UserResponse>,
    pub current_phase: OperationPhase,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
}

impl OperationDetail {
    pub fn new(
        op: Operation,
        team_lead: Option<UserResponse>,
        members: Vec<UserResponse>,
        tasks: Vec<Task>,
    ) -> Self {
        Self {
            id: op.id,
            name: op.name,
            kind: op.kind,
            description: op.description,
            scope: op.scope,
            roe: op.roe,
            team_lead,
            members,
            current_phase: op.current_phase,
            status: op.status,
            start_date: op.start_date,
            end_date: op.end_date,
            created_at: op.created_at,
            updated_at: op.updated_at,
            tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_value(OperationPhase::CommandAndControl).unwrap(),
            "command_and_control"
        );
        assert_eq!(
            serde_json::from_value::<OperationPhase>("privilege_escalation".into()).unwrap(),
            OperationPhase::PrivilegeEscalation
        );
        assert!(serde_json::from_value::<OperationPhase>("lunch".into()).is_err());
        assert_eq!(OperationPhase::default(), OperationPhase::Reconnaissance);
    }

    #[test]
    fn type_field_is_named_type() {
        let json = serde_json::to_value(OperationType::VulnerabilityAssessment).unwrap();
        assert_eq!(json, "vulnerability_assessment");
    }
}
