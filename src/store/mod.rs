// Authoritative Store Boundary - wire shapes and error mapping
//
// The external store owns the canonical current state and the transition
// history; this module defines the contract the library speaks at that
// boundary. No transport lives here.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::WorkflowError;
use crate::workflow::audit::{TransitionRecord, WorkflowSnapshot};
use crate::workflow::machine::{allowed_transitions, TransitionRequest};
use crate::workflow::state::WorkflowState;

pub use memory::{InMemoryWorkflowStore, InjectedFailure};

/// Successful transition response from the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub current_state: WorkflowState,
    pub previous_state: WorkflowState,
    pub transition_history: Vec<TransitionRecord>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Allowed-transitions query response.
///
/// Must always equal the local `allowed_transitions(current_state)`; a
/// mismatch means the client and server transition tables have drifted apart,
/// which `check_table_drift` surfaces as a defect rather than papering over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedTransitionsResponse {
    pub current_state: WorkflowState,
    pub allowed_transitions: Vec<WorkflowState>,
}

/// Interface to the authoritative workflow store.
///
/// Implementations re-validate every submission server-side regardless of any
/// client-side pre-check; the store's verdict is final.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Fetch the current view of a project.
    async fn fetch_snapshot(&self, project_key: &str) -> Result<WorkflowSnapshot, WorkflowError>;

    /// Query the store's own answer for the legal moves from the current state.
    async fn fetch_allowed_transitions(
        &self,
        project_key: &str,
    ) -> Result<AllowedTransitionsResponse, WorkflowError>;

    /// Submit a transition request for the project named in the request.
    async fn submit_transition(
        &self,
        request: &TransitionRequest,
    ) -> Result<TransitionResponse, WorkflowError>;
}

/// Map an HTTP status from the authoritative store onto the error taxonomy.
///
/// For transport implementations: 400 means the server rejected the move as
/// illegal (the client's snapshot was stale or its table wrong), 409 means
/// another actor got there first, 422 is a malformed request, 5xx is
/// transient.
pub fn error_for_status(
    status: u16,
    detail: &str,
    project_key: &str,
    from: WorkflowState,
    to: WorkflowState,
) -> WorkflowError {
    match status {
        400 => WorkflowError::IllegalTransition { from, to },
        404 => WorkflowError::NotFound {
            project_key: project_key.to_string(),
        },
        409 => WorkflowError::ConcurrentModification {
            project_key: project_key.to_string(),
        },
        422 => WorkflowError::ValidationFailure {
            reason: detail.to_string(),
        },
        500..=599 => WorkflowError::Transient {
            reason: format!("server error {status}: {detail}"),
        },
        _ => WorkflowError::Transient {
            reason: format!("unexpected status {status}: {detail}"),
        },
    }
}

/// Client/server disagreement over the transition table.
///
/// The server's answer is authoritative for display purposes, but the
/// disagreement itself is a defect to fix, so it is logged loudly and
/// reported to the caller instead of being silently absorbed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDrift {
    pub project_key: String,
    pub current_state: WorkflowState,
    pub server: Vec<WorkflowState>,
    pub client: Vec<WorkflowState>,
}

/// Compare the store's allowed-transitions answer against the local table.
pub fn check_table_drift(
    project_key: &str,
    response: &AllowedTransitionsResponse,
) -> Option<TableDrift> {
    let client = allowed_transitions(response.current_state);
    if response.allowed_transitions.as_slice() == client {
        return None;
    }

    error!(
        project_key = %project_key,
        current_state = %response.current_state,
        server = ?response.allowed_transitions,
        client = ?client,
        "transition table drift between client and server"
    );

    Some(TableDrift {
        project_key: project_key.to_string(),
        current_state: response.current_state,
        server: response.allowed_transitions.clone(),
        client: client.to_vec(),
    })
}
