//! Event types for DraftLoop run progress
//!
//! These events describe everything observable about a run:
//! - Run lifecycle (start, batch, pause, failure, reset)
//! - Role calls within a round (writer, reviewer)
//! - Completed rounds

use serde::{Deserialize, Serialize};

use crate::domain::{PauseReason, RoleTokens};
use crate::error::ErrorKind;

/// Core event enum - the vocabulary of run activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    // === Run Lifecycle ===
    /// A fresh run has started
    RunStarted {
        run_id: String,
        model: String,
        draft_count: u8,
        max_iterations: u32,
    },
    /// A batch of rounds is about to execute
    BatchStarted {
        run_id: String,
        start_round: u32,
        count: u32,
        manual: bool,
    },
    /// The run paused and is waiting for the operator
    RunPaused {
        run_id: String,
        reason: PauseReason,
        round: Option<u32>,
        score: Option<u8>,
    },
    /// The run failed
    RunFailed {
        run_id: String,
        kind: ErrorKind,
        message: String,
    },
    /// The run was reset to idle
    RunReset { run_id: String },

    // === Role Calls ===
    WriterStarted { run_id: String, round: u32, draft_count: u8 },
    WriterCompleted { run_id: String, round: u32, tokens: RoleTokens },
    ReviewerStarted { run_id: String, round: u32 },
    ReviewerCompleted {
        run_id: String,
        round: u32,
        selected_index: i64,
        /// Score of the selected draft (0 when the selection is unusable)
        score: u8,
        tokens: RoleTokens,
    },

    // === Rounds ===
    /// A round was appended to history
    RoundRecorded { run_id: String, round: u32, score: u8 },
}

impl RunEvent {
    /// Get the run ID for this event
    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::BatchStarted { run_id, .. }
            | RunEvent::RunPaused { run_id, .. }
            | RunEvent::RunFailed { run_id, .. }
            | RunEvent::RunReset { run_id }
            | RunEvent::WriterStarted { run_id, .. }
            | RunEvent::WriterCompleted { run_id, .. }
            | RunEvent::ReviewerStarted { run_id, .. }
            | RunEvent::ReviewerCompleted { run_id, .. }
            | RunEvent::RoundRecorded { run_id, .. } => run_id,
        }
    }

    /// Get a short name for the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "RunStarted",
            RunEvent::BatchStarted { .. } => "BatchStarted",
            RunEvent::RunPaused { .. } => "RunPaused",
            RunEvent::RunFailed { .. } => "RunFailed",
            RunEvent::RunReset { .. } => "RunReset",
            RunEvent::WriterStarted { .. } => "WriterStarted",
            RunEvent::WriterCompleted { .. } => "WriterCompleted",
            RunEvent::ReviewerStarted { .. } => "ReviewerStarted",
            RunEvent::ReviewerCompleted { .. } => "ReviewerCompleted",
            RunEvent::RoundRecorded { .. } => "RoundRecorded",
        }
    }
}
