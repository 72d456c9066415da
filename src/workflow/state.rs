// Core types for the project workflow state machine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle phase of a single project
///
/// Exactly one value holds per project at any time. The authoritative store
/// owns the canonical value; callers hold a local copy and refresh it after
/// every mutation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    /// Project is being set up, scope not yet committed
    Initiating,
    /// Scope and schedule are being planned
    Planning,
    /// Work is underway
    Executing,
    /// Delivered work is being tracked and verified
    Monitoring,
    /// Project is winding down
    Closing,
    /// Terminal state, no transitions permitted out of it
    Closed,
}

impl WorkflowState {
    /// All states in lifecycle order.
    pub const ALL: [WorkflowState; 6] = [
        WorkflowState::Initiating,
        WorkflowState::Planning,
        WorkflowState::Executing,
        WorkflowState::Monitoring,
        WorkflowState::Closing,
        WorkflowState::Closed,
    ];

    /// Wire representation, matching the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Initiating => "INITIATING",
            WorkflowState::Planning => "PLANNING",
            WorkflowState::Executing => "EXECUTING",
            WorkflowState::Monitoring => "MONITORING",
            WorkflowState::Closing => "CLOSING",
            WorkflowState::Closed => "CLOSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Closed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection from the strict parse boundary. External strings become
/// `WorkflowState` values only through `FromStr`; anything unrecognized is
/// refused here rather than guessed at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized workflow state: {input:?}")]
pub struct ParseStateError {
    pub input: String,
}

impl FromStr for WorkflowState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Whitespace and ASCII case are normalized; nothing fuzzier than that.
        match s.trim().to_ascii_uppercase().as_str() {
            "INITIATING" => Ok(WorkflowState::Initiating),
            "PLANNING" => Ok(WorkflowState::Planning),
            "EXECUTING" => Ok(WorkflowState::Executing),
            "MONITORING" => Ok(WorkflowState::Monitoring),
            "CLOSING" => Ok(WorkflowState::Closing),
            "CLOSED" => Ok(WorkflowState::Closed),
            _ => Err(ParseStateError {
                input: s.to_string(),
            }),
        }
    }
}
