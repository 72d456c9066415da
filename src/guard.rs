// Client-side gating for workflow transitions
//
// Mirrors the authoritative server's transition table to keep obviously
// illegal actions out of the UI, and interprets the server's verdict after
// submission. The server is always the source of truth; nothing here
// overrides its decision.

use tracing::{info, warn};

use crate::errors::WorkflowError;
use crate::store::{check_table_drift, TableDrift, TransitionResponse, WorkflowStore};
use crate::workflow::audit::{generate_correlation_id, AuditEvent, TransitionRecord, WorkflowSnapshot};
use crate::workflow::machine::{classify_transition_risk, TransitionRequest, TransitionRisk};
use crate::workflow::state::WorkflowState;

/// Whether the user has explicitly confirmed a critical transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    NotAsked,
    Confirmed,
}

/// Verdict for a single candidate transition, used to enable or disable the
/// corresponding UI control before any network round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed {
        risk: TransitionRisk,
        requires_confirmation: bool,
    },
    Blocked {
        from: WorkflowState,
        to: WorkflowState,
    },
}

/// Evaluate the gate for moving the snapshotted project to `target`.
///
/// Gates off the snapshot's own allowed set, which normally equals the local
/// table; after a `refresh` that flagged table drift it carries the server's
/// answer instead, so the gate stays consistent with what the UI displays
/// while the drift is outstanding. Advisory either way: a `Blocked` verdict
/// saves a futile round-trip, but an `Allowed` one can still be rejected by
/// the store if the snapshot went stale.
pub fn evaluate_gate(snapshot: &WorkflowSnapshot, target: WorkflowState) -> GateDecision {
    if !snapshot.allowed_transitions.contains(&target) {
        return GateDecision::Blocked {
            from: snapshot.current_state,
            to: target,
        };
    }

    let risk = classify_transition_risk(snapshot.current_state, target);
    GateDecision::Allowed {
        risk,
        requires_confirmation: risk == TransitionRisk::Critical,
    }
}

/// Outcome of an accepted submission: the store's response, the refreshed
/// local view derived from it, and the audit event for the transition.
#[derive(Debug)]
pub struct AcceptedTransition {
    pub response: TransitionResponse,
    pub snapshot: WorkflowSnapshot,
    pub audit_event: AuditEvent,
}

/// Coordinates gate checks, submission, and outcome interpretation against a
/// store. Holds no project state of its own; the caller owns the snapshot and
/// refreshes it after every mutation.
pub struct TransitionGuard<S> {
    store: S,
}

impl<S: WorkflowStore> TransitionGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Submit a transition computed against `snapshot`.
    ///
    /// Refuses unconfirmed critical transitions and table-illegal moves
    /// before touching the store. On a conflict the caller must `refresh` and
    /// re-evaluate legality before any new attempt - the original request was
    /// premised on a state that no longer holds, so it is never resubmitted
    /// here.
    pub async fn submit(
        &self,
        snapshot: &WorkflowSnapshot,
        request: TransitionRequest,
        confirmation: Confirmation,
    ) -> Result<AcceptedTransition, WorkflowError> {
        let correlation_id = generate_correlation_id();

        match evaluate_gate(snapshot, request.to_state) {
            GateDecision::Blocked { from, to } => {
                warn!(
                    project_key = %request.project_key,
                    from = %from,
                    to = %to,
                    correlation_id = %correlation_id,
                    "transition blocked client-side"
                );
                return Err(WorkflowError::IllegalTransition { from, to });
            }
            GateDecision::Allowed {
                requires_confirmation: true,
                ..
            } if confirmation != Confirmation::Confirmed => {
                return Err(WorkflowError::ConfirmationRequired {
                    to: request.to_state,
                });
            }
            GateDecision::Allowed { .. } => {}
        }

        let response = match self.store.submit_transition(&request).await {
            Ok(response) => response,
            Err(err) => {
                if matches!(err, WorkflowError::ConcurrentModification { .. }) {
                    warn!(
                        project_key = %request.project_key,
                        correlation_id = %correlation_id,
                        "concurrent modification, local snapshot is stale"
                    );
                }
                return Err(err);
            }
        };

        let record = TransitionRecord {
            from_state: response.previous_state,
            to_state: response.current_state,
            timestamp: response.updated_at,
            actor: request.actor.clone(),
            reason: request.reason.clone(),
        };
        let audit_event =
            AuditEvent::for_transition(&request.project_key, &record, Some(correlation_id.clone()));

        info!(
            project_key = %request.project_key,
            from = %response.previous_state,
            to = %response.current_state,
            actor = %request.actor,
            event_id = %audit_event.event_id,
            correlation_id = %correlation_id,
            "workflow transition accepted"
        );

        let snapshot = WorkflowSnapshot::derive(
            request.project_key.clone(),
            response.current_state,
            response.updated_at,
            response.updated_by.clone(),
        );

        Ok(AcceptedTransition {
            response,
            snapshot,
            audit_event,
        })
    }

    /// Re-fetch the authoritative view of a project.
    ///
    /// Runs the table drift check against the store's allowed-transitions
    /// answer. On disagreement the server's answer wins for display and the
    /// mismatch is reported so it gets fixed rather than papered over.
    ///
    /// The snapshot and the allowed-transitions answer are two store calls;
    /// if the project transitions between them the pair is torn. The drift
    /// check is skipped in that case - splicing one state's allowed set onto
    /// another state's snapshot would corrupt both - and the caller simply
    /// refreshes again.
    pub async fn refresh(
        &self,
        project_key: &str,
    ) -> Result<(WorkflowSnapshot, Option<TableDrift>), WorkflowError> {
        let mut snapshot = self.store.fetch_snapshot(project_key).await?;
        let allowed = self.store.fetch_allowed_transitions(project_key).await?;

        if allowed.current_state != snapshot.current_state {
            warn!(
                project_key = %project_key,
                snapshot_state = %snapshot.current_state,
                allowed_state = %allowed.current_state,
                "state changed between refresh reads, skipping drift check"
            );
            return Ok((snapshot, None));
        }

        let drift = check_table_drift(project_key, &allowed);
        if drift.is_some() {
            snapshot.allowed_transitions = allowed.allowed_transitions;
        }

        Ok((snapshot, drift))
    }
}
