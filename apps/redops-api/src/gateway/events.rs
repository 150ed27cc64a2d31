//! Wire format for live events and the event-type vocabulary.

use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One serialized text frame, shared cheaply across every endpoint queue.
pub type Frame = Utf8Bytes;

/// An event pushed to connected clients: `{"type": ..., "payload": ...}`.
///
/// The hub never looks inside; it only moves the encoded [`Frame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl HubEvent {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Build an event from any serializable body.
    pub fn from_body<T: Serialize>(kind: &str, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_value(body)?))
    }

    /// Serialize once into the frame that is fanned out.
    pub fn encode(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}

/// Event types dispatched to clients.
pub struct EventType;

impl EventType {
    pub const NOTIFICATION: &'static str = "notification";
    pub const OPERATION_CREATED: &'static str = "operation_created";
    pub const OPERATION_UPDATED: &'static str = "operation_updated";
    pub const OPERATION_DELETED: &'static str = "operation_deleted";
    pub const OPERATION_PHASE_CHANGED: &'static str = "operation_phase_changed";
    pub const TASK_CREATED: &'static str = "task_created";
    pub const TASK_UPDATED: &'static str = "task_updated";
    pub const TASK_DELETED: &'static str = "task_deleted";
    pub const TOOL_CREATED: &'static str = "tool_created";
    pub const TOOL_UPDATED: &'static str = "tool_updated";
    pub const TOOL_DELETED: &'static str = "tool_deleted";
    pub const RESULTS_IMPORTED: &'static str = "results_imported";
    pub const RESULTS_DELETED: &'static str = "results_deleted";
}
