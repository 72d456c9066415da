// Workflow Module - project lifecycle state machine
//
// Owns the canonical transition table and the pure validation functions
// evaluated client-side to mirror the authoritative server's enforcement.

pub mod audit;
pub mod machine;
pub mod state;

pub use audit::{AuditEvent, TransitionRecord, WorkflowSnapshot};
pub use machine::{
    allowed_transitions, build_transition_request, classify_transition_risk,
    is_transition_allowed, TransitionRequest, TransitionRisk,
};
pub use state::{ParseStateError, WorkflowState};
