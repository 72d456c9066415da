use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::machine::allowed_transitions;
use crate::workflow::state::WorkflowState;

/// Event type recorded for accepted workflow transitions.
pub const TRANSITION_EVENT_TYPE: &str = "workflow.transition";

/// Immutable history entry for one accepted transition.
///
/// Append-only: once written it is never mutated or deleted. A project's
/// history is ordered by ascending timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Derived view of a project's position in the lifecycle.
///
/// `allowed_transitions` is recomputed from the table whenever the current
/// state changes, never stored. The authoritative store owns the canonical
/// `current_state`; callers refresh this view after every mutation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub project_key: String,
    pub current_state: WorkflowState,
    pub allowed_transitions: Vec<WorkflowState>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl WorkflowSnapshot {
    pub fn derive(
        project_key: String,
        current_state: WorkflowState,
        updated_at: DateTime<Utc>,
        updated_by: String,
    ) -> Self {
        Self {
            project_key,
            current_state,
            allowed_transitions: allowed_transitions(current_state).to_vec(),
            updated_at,
            updated_by,
        }
    }
}

/// Audit trail entry for any lifecycle-affecting action.
///
/// Created at the moment the authoritative store accepts the action;
/// immutable thereafter and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub project_key: String,
    pub event_type: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub payload_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_hash: Option<String>,
}

impl AuditEvent {
    /// Build the audit event for an accepted transition.
    pub fn for_transition(
        project_key: &str,
        record: &TransitionRecord,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            project_key: project_key.to_string(),
            event_type: TRANSITION_EVENT_TYPE.to_string(),
            actor: record.actor.clone(),
            timestamp: record.timestamp,
            payload_summary: format!("{} -> {}", record.from_state, record.to_state),
            correlation_id,
            resource_hash: None,
        }
    }
}

/// Generate a correlation ID for linking related operations.
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
