use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;
use crate::workflow::state::WorkflowState;

/// How much ceremony a transition deserves in the UI.
///
/// `Critical` transitions enter a terminal or near-terminal phase and must be
/// explicitly confirmed by the user before submission. `Normal` transitions
/// may be submitted immediately on user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionRisk {
    Normal,
    Critical,
}

/// Outbound payload for a state update against the authoritative store.
///
/// Serializes to exactly `{to_state, actor, reason}`; the project key routes
/// the request but is not part of the wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    #[serde(skip)]
    pub project_key: String,
    pub to_state: WorkflowState,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ordered set of states reachable from `current` in one legal transition,
/// forward moves first, then the single backward correction where one exists.
///
/// Total over the enumeration and pure; `Closed` yields an empty slice. This
/// table is the canonical definition - everything else in the crate derives
/// from it, and the authoritative server is expected to enforce the same
/// table (see `store::check_table_drift`).
pub fn allowed_transitions(current: WorkflowState) -> &'static [WorkflowState] {
    match current {
        WorkflowState::Initiating => &[WorkflowState::Planning],
        WorkflowState::Planning => &[WorkflowState::Executing, WorkflowState::Initiating],
        WorkflowState::Executing => &[WorkflowState::Monitoring, WorkflowState::Planning],
        WorkflowState::Monitoring => &[WorkflowState::Closing, WorkflowState::Executing],
        WorkflowState::Closing => &[WorkflowState::Closed],
        WorkflowState::Closed => &[],
    }
}

/// True iff `target` is directly reachable from `current`.
///
/// Advisory only: this gates UI controls before any network round-trip, but
/// the authoritative store re-validates every submission and its verdict
/// wins. A server rejection of an "allowed" transition must be surfaced
/// as-is, never overridden.
pub fn is_transition_allowed(current: WorkflowState, target: WorkflowState) -> bool {
    allowed_transitions(current).contains(&target)
}

/// Transitions into `Closing` or `Closed` are critical; everything else is
/// normal. A safety policy against accidental terminal-state entry, not a
/// correctness rule.
pub fn classify_transition_risk(
    _current: WorkflowState,
    target: WorkflowState,
) -> TransitionRisk {
    match target {
        WorkflowState::Closing | WorkflowState::Closed => TransitionRisk::Critical,
        _ => TransitionRisk::Normal,
    }
}

/// Build the outbound transition payload.
///
/// Rejects a blank `actor` as a `ValidationFailure`. Does not check
/// transition legality - that is the caller's job via `is_transition_allowed`
/// before submission, and the authoritative store's job after.
pub fn build_transition_request(
    project_key: &str,
    to_state: WorkflowState,
    actor: &str,
    reason: Option<&str>,
) -> Result<TransitionRequest, WorkflowError> {
    if actor.trim().is_empty() {
        return Err(WorkflowError::ValidationFailure {
            reason: "actor must be a non-empty identifier".to_string(),
        });
    }

    Ok(TransitionRequest {
        project_key: project_key.to_string(),
        to_state,
        actor: actor.to_string(),
        reason: reason.map(str::to_string),
    })
}
