// Project Workflow Library - lifecycle state machine and guard logic
// Exposes the transition table, validation, and store boundary for UI code and tests

pub mod errors;
pub mod guard;
pub mod store;
pub mod workflow;

// Re-export key types for easy access
pub use errors::WorkflowError;
pub use guard::{evaluate_gate, AcceptedTransition, Confirmation, GateDecision, TransitionGuard};
pub use store::{
    check_table_drift, error_for_status, AllowedTransitionsResponse, InMemoryWorkflowStore,
    InjectedFailure, TableDrift, TransitionResponse, WorkflowStore,
};
pub use workflow::audit::{
    generate_correlation_id, AuditEvent, TransitionRecord, WorkflowSnapshot,
};
pub use workflow::machine::{
    allowed_transitions, build_transition_request, classify_transition_risk,
    is_transition_allowed, TransitionRequest, TransitionRisk,
};
pub use workflow::state::{ParseStateError, WorkflowState};
