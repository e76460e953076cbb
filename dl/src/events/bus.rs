//! Event Bus - pub/sub for run progress
//!
//! The EventBus uses a tokio broadcast channel to deliver events to all
//! subscribers. The controller emits; the CLI status printer subscribes.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::RunEvent;
use crate::domain::{PauseReason, RoleTokens};
use crate::error::ErrorKind;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Central event bus for run activity
pub struct EventBus {
    tx: broadcast::Sender<RunEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped.
    pub fn emit(&self, event: RunEvent) {
        debug!(event_type = event.event_type(), run_id = event.run_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter bound to one run
    pub fn emitter_for(&self, run_id: impl Into<String>) -> EventEmitter {
        let run_id = run_id.into();
        debug!(%run_id, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            run_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle that emits events with a pre-set run ID
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<RunEvent>,
    run_id: String,
}

impl EventEmitter {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit a raw event
    pub fn emit(&self, event: RunEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    pub fn run_started(&self, model: &str, draft_count: u8, max_iterations: u32) {
        self.emit(RunEvent::RunStarted {
            run_id: self.run_id.clone(),
            model: model.to_string(),
            draft_count,
            max_iterations,
        });
    }

    pub fn batch_started(&self, start_round: u32, count: u32, manual: bool) {
        self.emit(RunEvent::BatchStarted {
            run_id: self.run_id.clone(),
            start_round,
            count,
            manual,
        });
    }

    pub fn run_paused(&self, reason: PauseReason, round: Option<u32>, score: Option<u8>) {
        self.emit(RunEvent::RunPaused {
            run_id: self.run_id.clone(),
            reason,
            round,
            score,
        });
    }

    pub fn run_failed(&self, kind: ErrorKind, message: &str) {
        self.emit(RunEvent::RunFailed {
            run_id: self.run_id.clone(),
            kind,
            message: message.to_string(),
        });
    }

    pub fn run_reset(&self) {
        self.emit(RunEvent::RunReset {
            run_id: self.run_id.clone(),
        });
    }

    pub fn writer_started(&self, round: u32, draft_count: u8) {
        self.emit(RunEvent::WriterStarted {
            run_id: self.run_id.clone(),
            round,
            draft_count,
        });
    }

    pub fn writer_completed(&self, round: u32, tokens: RoleTokens) {
        self.emit(RunEvent::WriterCompleted {
            run_id: self.run_id.clone(),
            round,
            tokens,
        });
    }

    pub fn reviewer_started(&self, round: u32) {
        self.emit(RunEvent::ReviewerStarted {
            run_id: self.run_id.clone(),
            round,
        });
    }

    pub fn reviewer_completed(&self, round: u32, selected_index: i64, score: u8, tokens: RoleTokens) {
        self.emit(RunEvent::ReviewerCompleted {
            run_id: self.run_id.clone(),
            round,
            selected_index,
            score,
            tokens,
        });
    }

    pub fn round_recorded(&self, round: u32, score: u8) {
        self.emit(RunEvent::RoundRecorded {
            run_id: self.run_id.clone(),
            round,
            score,
        });
    }
}
