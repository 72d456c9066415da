// In-memory authoritative store - no side effects beyond its own map
//
// Reference implementation of the store contract for tests and local
// harnesses. Enforces the same transition table server-side that the client
// mirrors, and supports injecting the failure modes a real store can produce.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::errors::WorkflowError;
use crate::store::{AllowedTransitionsResponse, TransitionResponse, WorkflowStore};
use crate::workflow::audit::{TransitionRecord, WorkflowSnapshot};
use crate::workflow::machine::{allowed_transitions, is_transition_allowed, TransitionRequest};
use crate::workflow::state::WorkflowState;

/// Failure injected into the next `submit_transition` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Another actor's transition won the race.
    Conflict,
    /// Server-side 5xx equivalent.
    Transient,
}

#[derive(Debug, Clone)]
struct ProjectEntry {
    state: WorkflowState,
    history: Vec<TransitionRecord>,
    updated_at: chrono::DateTime<Utc>,
    updated_by: String,
}

/// Mock authoritative store backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    projects: Mutex<HashMap<String, ProjectEntry>>,
    fail_next: Mutex<Option<InjectedFailure>>,
    drift_override: Mutex<Option<Vec<WorkflowState>>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a project at a given lifecycle phase with empty history.
    pub fn seed_project(&self, project_key: &str, state: WorkflowState, updated_by: &str) {
        let mut projects = self.projects.lock().unwrap();
        projects.insert(
            project_key.to_string(),
            ProjectEntry {
                state,
                history: Vec::new(),
                updated_at: Utc::now(),
                updated_by: updated_by.to_string(),
            },
        );
    }

    /// Fail the next submission with the given mode, then clear.
    pub fn inject_failure(&self, failure: InjectedFailure) {
        *self.fail_next.lock().unwrap() = Some(failure);
    }

    /// Make `fetch_allowed_transitions` answer with a table that differs from
    /// the client's, simulating client/server drift.
    pub fn inject_drifted_table(&self, allowed: Vec<WorkflowState>) {
        *self.drift_override.lock().unwrap() = Some(allowed);
    }

    /// Current state of a seeded project, for test assertions.
    pub fn current_state(&self, project_key: &str) -> Option<WorkflowState> {
        self.projects
            .lock()
            .unwrap()
            .get(project_key)
            .map(|entry| entry.state)
    }

    /// Number of history entries recorded for a project.
    pub fn history_len(&self, project_key: &str) -> usize {
        self.projects
            .lock()
            .unwrap()
            .get(project_key)
            .map(|entry| entry.history.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn fetch_snapshot(&self, project_key: &str) -> Result<WorkflowSnapshot, WorkflowError> {
        let projects = self.projects.lock().unwrap();
        let entry = projects
            .get(project_key)
            .ok_or_else(|| WorkflowError::NotFound {
                project_key: project_key.to_string(),
            })?;

        Ok(WorkflowSnapshot::derive(
            project_key.to_string(),
            entry.state,
            entry.updated_at,
            entry.updated_by.clone(),
        ))
    }

    async fn fetch_allowed_transitions(
        &self,
        project_key: &str,
    ) -> Result<AllowedTransitionsResponse, WorkflowError> {
        let projects = self.projects.lock().unwrap();
        let entry = projects
            .get(project_key)
            .ok_or_else(|| WorkflowError::NotFound {
                project_key: project_key.to_string(),
            })?;

        let allowed = match self.drift_override.lock().unwrap().clone() {
            Some(overridden) => overridden,
            None => allowed_transitions(entry.state).to_vec(),
        };

        Ok(AllowedTransitionsResponse {
            current_state: entry.state,
            allowed_transitions: allowed,
        })
    }

    async fn submit_transition(
        &self,
        request: &TransitionRequest,
    ) -> Result<TransitionResponse, WorkflowError> {
        if request.actor.trim().is_empty() {
            return Err(WorkflowError::ValidationFailure {
                reason: "actor is required".to_string(),
            });
        }

        if let Some(failure) = self.fail_next.lock().unwrap().take() {
            return Err(match failure {
                InjectedFailure::Conflict => WorkflowError::ConcurrentModification {
                    project_key: request.project_key.clone(),
                },
                InjectedFailure::Transient => WorkflowError::Transient {
                    reason: "injected server failure".to_string(),
                },
            });
        }

        let mut projects = self.projects.lock().unwrap();
        let entry = projects
            .get_mut(&request.project_key)
            .ok_or_else(|| WorkflowError::NotFound {
                project_key: request.project_key.clone(),
            })?;

        // Server-side enforcement: the store re-checks legality no matter
        // what the client concluded.
        if !is_transition_allowed(entry.state, request.to_state) {
            warn!(
                project_key = %request.project_key,
                from = %entry.state,
                to = %request.to_state,
                "store rejected illegal transition"
            );
            return Err(WorkflowError::IllegalTransition {
                from: entry.state,
                to: request.to_state,
            });
        }

        let previous_state = entry.state;
        let now = Utc::now();

        entry.history.push(TransitionRecord {
            from_state: previous_state,
            to_state: request.to_state,
            timestamp: now,
            actor: request.actor.clone(),
            reason: request.reason.clone(),
        });
        entry.state = request.to_state;
        entry.updated_at = now;
        entry.updated_by = request.actor.clone();

        Ok(TransitionResponse {
            current_state: entry.state,
            previous_state,
            transition_history: entry.history.clone(),
            updated_at: now,
            updated_by: entry.updated_by.clone(),
        })
    }
}
