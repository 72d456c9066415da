//! Integration tests for the transition guard against the in-memory store
//!
//! Exercises the full submit path: client-side gating, confirmation policy
//! for critical transitions, conflict interpretation, and table drift
//! detection on refresh.

use std::sync::Once;

use project_workflow::{
    build_transition_request, evaluate_gate, AllowedTransitionsResponse, Confirmation,
    GateDecision, InMemoryWorkflowStore, InjectedFailure, TransitionGuard, TransitionRequest,
    TransitionResponse, TransitionRisk, WorkflowError, WorkflowSnapshot, WorkflowState,
    WorkflowStore,
};

use project_workflow::WorkflowState::{
    Closed, Closing, Executing, Initiating, Monitoring, Planning,
};

/// Capture the guard's structured tracing output in test runs.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn guard_with_project(state: WorkflowState) -> TransitionGuard<InMemoryWorkflowStore> {
    init_tracing();
    let store = InMemoryWorkflowStore::new();
    store.seed_project("PROJ-1", state, "seed");
    TransitionGuard::new(store)
}

#[tokio::test]
async fn test_submit_accepts_legal_transition_and_returns_new_view() {
    let guard = guard_with_project(Initiating);
    let (snapshot, _) = guard.refresh("PROJ-1").await.unwrap();

    let request =
        build_transition_request("PROJ-1", Planning, "alice", Some("scope agreed")).unwrap();
    let accepted = guard
        .submit(&snapshot, request, Confirmation::NotAsked)
        .await
        .unwrap();

    assert_eq!(accepted.response.previous_state, Initiating);
    assert_eq!(accepted.response.current_state, Planning);
    assert_eq!(accepted.snapshot.current_state, Planning);
    assert_eq!(
        accepted.snapshot.allowed_transitions,
        vec![Executing, Initiating]
    );
    assert_eq!(accepted.snapshot.updated_by, "alice");

    assert_eq!(accepted.audit_event.payload_summary, "INITIATING -> PLANNING");
    assert_eq!(accepted.audit_event.actor, "alice");
    assert!(accepted.audit_event.correlation_id.is_some());
}

#[tokio::test]
async fn test_submit_blocks_illegal_transition_before_the_store_sees_it() {
    let guard = guard_with_project(Planning);
    let (snapshot, _) = guard.refresh("PROJ-1").await.unwrap();

    let request = build_transition_request("PROJ-1", Closed, "alice", None).unwrap();
    let err = guard
        .submit(&snapshot, request, Confirmation::Confirmed)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::IllegalTransition {
            from: Planning,
            to: Closed,
        }
    ));
    // Nothing reached the store.
    assert_eq!(guard.store().history_len("PROJ-1"), 0);
}

#[tokio::test]
async fn test_critical_transition_requires_confirmation() {
    let guard = guard_with_project(Monitoring);
    let (snapshot, _) = guard.refresh("PROJ-1").await.unwrap();

    match evaluate_gate(&snapshot, Closing) {
        GateDecision::Allowed {
            risk,
            requires_confirmation,
        } => {
            assert_eq!(risk, TransitionRisk::Critical);
            assert!(requires_confirmation);
        }
        GateDecision::Blocked { .. } => panic!("MONITORING -> CLOSING must be allowed"),
    }

    let request = build_transition_request("PROJ-1", Closing, "alice", None).unwrap();
    let err = guard
        .submit(&snapshot, request.clone(), Confirmation::NotAsked)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ConfirmationRequired { to: Closing }));
    assert_eq!(guard.store().current_state("PROJ-1"), Some(Monitoring));

    // Confirmed, the same request goes through.
    let accepted = guard
        .submit(&snapshot, request, Confirmation::Confirmed)
        .await
        .unwrap();
    assert_eq!(accepted.response.current_state, Closing);
}

#[tokio::test]
async fn test_normal_transition_needs_no_confirmation() {
    let guard = guard_with_project(Executing);
    let (snapshot, _) = guard.refresh("PROJ-1").await.unwrap();

    // Backward correction is a normal move.
    let request = build_transition_request("PROJ-1", Planning, "bob", Some("replan")).unwrap();
    let accepted = guard
        .submit(&snapshot, request, Confirmation::NotAsked)
        .await
        .unwrap();
    assert_eq!(accepted.response.current_state, Planning);
}

#[tokio::test]
async fn test_conflict_is_surfaced_and_refresh_recovers() {
    let guard = guard_with_project(Planning);
    let (snapshot, _) = guard.refresh("PROJ-1").await.unwrap();

    guard.store().inject_failure(InjectedFailure::Conflict);

    let request = build_transition_request("PROJ-1", Executing, "alice", None).unwrap();
    let err = guard
        .submit(&snapshot, request, Confirmation::NotAsked)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::ConcurrentModification { .. }));
    assert!(!err.retryable());

    // The corrective path is refresh-then-re-evaluate, never blind resubmit.
    let (refreshed, drift) = guard.refresh("PROJ-1").await.unwrap();
    assert!(drift.is_none());
    assert_eq!(refreshed.current_state, Planning);

    let retry = build_transition_request("PROJ-1", Executing, "alice", None).unwrap();
    let accepted = guard
        .submit(&refreshed, retry, Confirmation::NotAsked)
        .await
        .unwrap();
    assert_eq!(accepted.response.current_state, Executing);
}

#[tokio::test]
async fn test_transient_failure_is_marked_retryable() {
    let guard = guard_with_project(Planning);
    let (snapshot, _) = guard.refresh("PROJ-1").await.unwrap();

    guard.store().inject_failure(InjectedFailure::Transient);

    let request = build_transition_request("PROJ-1", Executing, "alice", None).unwrap();
    let err = guard
        .submit(&snapshot, request, Confirmation::NotAsked)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Transient { .. }));
    assert!(err.retryable());
}

#[tokio::test]
async fn test_refresh_reports_table_drift_and_prefers_server_answer() {
    let guard = guard_with_project(Monitoring);

    // Server claims MONITORING may also jump back to INITIATING.
    guard
        .store()
        .inject_drifted_table(vec![Closing, Executing, Initiating]);

    let (snapshot, drift) = guard.refresh("PROJ-1").await.unwrap();

    let drift = drift.expect("drift must be reported");
    assert_eq!(drift.current_state, Monitoring);
    assert_eq!(drift.client, vec![Closing, Executing]);
    assert_eq!(drift.server, vec![Closing, Executing, Initiating]);

    // Display follows the server while the defect gets fixed.
    assert_eq!(
        snapshot.allowed_transitions,
        vec![Closing, Executing, Initiating]
    );
}

#[tokio::test]
async fn test_gate_follows_server_answer_after_drift_refresh() {
    let guard = guard_with_project(Monitoring);

    // Before drift, the table blocks MONITORING -> INITIATING.
    let (snapshot, _) = guard.refresh("PROJ-1").await.unwrap();
    assert!(matches!(
        evaluate_gate(&snapshot, Initiating),
        GateDecision::Blocked { .. }
    ));

    guard
        .store()
        .inject_drifted_table(vec![Closing, Executing, Initiating]);

    let (snapshot, drift) = guard.refresh("PROJ-1").await.unwrap();
    assert!(drift.is_some());

    // The gate agrees with the displayed allowed set, which carries the
    // server's authoritative answer while the drift is outstanding.
    assert!(matches!(
        evaluate_gate(&snapshot, Initiating),
        GateDecision::Allowed {
            risk: TransitionRisk::Normal,
            ..
        }
    ));
    assert!(matches!(
        evaluate_gate(&snapshot, Planning),
        GateDecision::Blocked { .. }
    ));
}

/// Store whose two refresh reads disagree on the current state, as when the
/// project transitions between the snapshot fetch and the allowed query.
struct TornReadStore;

#[async_trait::async_trait]
impl WorkflowStore for TornReadStore {
    async fn fetch_snapshot(&self, project_key: &str) -> Result<WorkflowSnapshot, WorkflowError> {
        Ok(WorkflowSnapshot::derive(
            project_key.to_string(),
            Planning,
            chrono::Utc::now(),
            "alice".to_string(),
        ))
    }

    async fn fetch_allowed_transitions(
        &self,
        _project_key: &str,
    ) -> Result<AllowedTransitionsResponse, WorkflowError> {
        // Answers for EXECUTING, and with a list the local table disagrees
        // with on top of that.
        Ok(AllowedTransitionsResponse {
            current_state: Executing,
            allowed_transitions: vec![Monitoring],
        })
    }

    async fn submit_transition(
        &self,
        request: &TransitionRequest,
    ) -> Result<TransitionResponse, WorkflowError> {
        Err(WorkflowError::Transient {
            reason: format!("unexpected submit for {}", request.project_key),
        })
    }
}

#[tokio::test]
async fn test_refresh_skips_drift_check_when_reads_are_torn() {
    init_tracing();
    let guard = TransitionGuard::new(TornReadStore);

    let (snapshot, drift) = guard.refresh("PROJ-1").await.unwrap();

    // No drift is reported and the other state's allowed set is not spliced
    // onto the snapshot; the caller refreshes again for a coherent pair.
    assert!(drift.is_none());
    assert_eq!(snapshot.current_state, Planning);
    assert_eq!(snapshot.allowed_transitions, vec![Executing, Initiating]);
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    init_tracing();
    let guard = TransitionGuard::new(InMemoryWorkflowStore::new());

    let err = guard.refresh("PROJ-404").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}

#[tokio::test]
async fn test_full_lifecycle_builds_complete_audit_trail() {
    let guard = guard_with_project(Initiating);
    let (mut snapshot, _) = guard.refresh("PROJ-1").await.unwrap();

    let path = [Planning, Executing, Monitoring, Closing, Closed];
    for to_state in path {
        let request = build_transition_request("PROJ-1", to_state, "alice", None).unwrap();
        let accepted = guard
            .submit(&snapshot, request, Confirmation::Confirmed)
            .await
            .unwrap();
        snapshot = accepted.snapshot;
    }

    assert_eq!(snapshot.current_state, Closed);
    assert!(snapshot.allowed_transitions.is_empty());
    assert_eq!(guard.store().history_len("PROJ-1"), path.len());

    // The terminal state is a dead end.
    let request = build_transition_request("PROJ-1", Initiating, "alice", None).unwrap();
    let err = guard
        .submit(&snapshot, request, Confirmation::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
}
