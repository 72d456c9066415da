use thiserror::Error;

use crate::workflow::state::WorkflowState;

/// Failure taxonomy for transition submission and guard evaluation.
///
/// Submission failures are returned to the caller as values, never swallowed;
/// the UI owns user-visible messaging and refreshes its local snapshot after
/// any non-transient failure.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The requested target is not reachable from the current state. Detected
    /// client-side before submission where possible; a server-side detection
    /// (race against a stale client snapshot) surfaces the same way.
    #[error("illegal transition: {from} -> {to} is not permitted")]
    IllegalTransition {
        from: WorkflowState,
        to: WorkflowState,
    },

    /// Another actor's transition was accepted first. The snapshot this
    /// request was computed against is stale; refresh and re-evaluate
    /// legality before any new attempt. Never resubmit as-is.
    #[error("concurrent modification: project {project_key} changed since last refresh")]
    ConcurrentModification { project_key: String },

    /// Malformed request, a caller-side bug. Not retryable.
    #[error("validation failed: {reason}")]
    ValidationFailure { reason: String },

    #[error("project not found: {project_key}")]
    NotFound { project_key: String },

    /// Network or server-side 5xx failure. Retry policy, if any, belongs to
    /// the transport layer, not to this crate.
    #[error("transient store failure: {reason}")]
    Transient { reason: String },

    /// A critical transition was submitted without explicit confirmation.
    #[error("critical transition to {to} requires explicit confirmation")]
    ConfirmationRequired { to: WorkflowState },
}

impl WorkflowError {
    /// Only transient failures are candidates for transport-level retry.
    /// Everything else requires a caller-side correction first.
    pub fn retryable(&self) -> bool {
        matches!(self, WorkflowError::Transient { .. })
    }
}
