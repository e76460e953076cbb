//! Run controller
//!
//! Owns everything about one run: its configuration, state, history and token
//! totals. Starts automatic batches, continues paused runs manually, and
//! records the failure that ended a run.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::accountant::TokenAccountant;
use super::orchestrator::{Batch, BatchOutcome, IterationOrchestrator};
use crate::domain::{IterationHistory, PauseReason, RunConfiguration, RunState};
use crate::error::{ErrorKind, RunError, RunFailure};
use crate::events::{EventBus, EventEmitter};
use crate::llm::ModelClient;
use crate::prompts::PromptLoader;

pub struct RunController {
    client: Arc<dyn ModelClient>,
    prompts: PromptLoader,
    events: Option<Arc<EventBus>>,
    emitter: Option<EventEmitter>,
    config: Option<RunConfiguration>,
    state: RunState,
    history: IterationHistory,
    tokens: TokenAccountant,
    run_id: Option<String>,
    last_failure: Option<RunFailure>,
    last_pause: Option<PauseReason>,
}

impl RunController {
    pub fn new(client: Arc<dyn ModelClient>, prompts: PromptLoader) -> Self {
        debug!("RunController::new: called");
        Self {
            client,
            prompts,
            events: None,
            emitter: None,
            config: None,
            state: RunState::Idle,
            history: IterationHistory::new(),
            tokens: TokenAccountant::new(),
            run_id: None,
            last_failure: None,
            last_pause: None,
        }
    }

    /// Builder: publish progress on `bus`
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Start a fresh run and execute its automatic batch
    ///
    /// Configuration problems are reported before any model call and leave the
    /// controller untouched.
    pub async fn start(&mut self, config: RunConfiguration) -> Result<BatchOutcome, RunError> {
        debug!(state = %self.state, "RunController::start: called");
        if self.state == RunState::Running {
            return Err(RunError::InvalidState("a run is already in progress".to_string()));
        }

        config.validate()?;
        self.prompts
            .preflight()
            .map_err(|e| RunError::ConfigurationInvalid(e.to_string()))?;

        let run_id = uuid::Uuid::now_v7().to_string();
        info!(
            "Starting run {} with model {} ({} drafts, {}-{} rounds, target {})",
            run_id, config.model_name, config.draft_count, config.min_iterations, config.max_iterations, config.target_score
        );

        self.history = IterationHistory::new();
        self.tokens.reset();
        self.last_failure = None;
        self.last_pause = None;
        self.emitter = self.events.as_ref().map(|bus| bus.emitter_for(run_id.as_str()));
        self.run_id = Some(run_id);

        if let Some(emitter) = &self.emitter {
            emitter.run_started(&config.model_name, config.draft_count, config.max_iterations);
        }

        let count = config.max_iterations;
        self.config = Some(config);
        self.run_batch(Batch::automatic(count)).await
    }

    /// Run exactly `round_count` more rounds from a paused run
    ///
    /// The first of those rounds uses `feedback` verbatim in place of the
    /// latest consolidated feedback. The convergence policy is not consulted.
    pub async fn continue_manually(&mut self, round_count: u32, feedback: &str) -> Result<BatchOutcome, RunError> {
        debug!(round_count, state = %self.state, "RunController::continue_manually: called");
        if self.state != RunState::Paused {
            return Err(RunError::InvalidState(format!(
                "manual continuation requires a paused run (current state: {})",
                self.state
            )));
        }
        if round_count < 1 {
            return Err(RunError::ConfigurationInvalid(
                "Number of rounds to continue must be at least 1".to_string(),
            ));
        }
        if feedback.trim().is_empty() {
            return Err(RunError::ConfigurationInvalid(
                "Feedback for manual continuation must not be empty".to_string(),
            ));
        }

        self.prompts
            .preflight()
            .map_err(|e| RunError::ConfigurationInvalid(e.to_string()))?;

        let start_id = self.history.next_round_id();
        info!("Continuing manually with {} rounds starting at round {}", round_count, start_id);
        self.run_batch(Batch::manual(start_id, round_count, Some(feedback))).await
    }

    /// Discard the run and return to `Idle`
    pub fn reset(&mut self) {
        debug!(state = %self.state, "RunController::reset: called");
        if let Some(emitter) = self.emitter.take() {
            emitter.run_reset();
        }
        self.config = None;
        self.state = RunState::Idle;
        self.history = IterationHistory::new();
        self.tokens.reset();
        self.run_id = None;
        self.last_failure = None;
        self.last_pause = None;
    }

    /// Execute one batch, moving the run to `Paused` or `Failed`
    ///
    /// The run is `Running` while the batch is awaited. If the future is
    /// dropped before it finishes, the run ends in `Failed` so it can be
    /// restarted.
    async fn run_batch(&mut self, batch: Batch<'_>) -> Result<BatchOutcome, RunError> {
        let Self {
            client,
            prompts,
            emitter,
            config,
            state,
            history,
            tokens,
            last_failure,
            last_pause,
            ..
        } = self;

        let Some(config) = config.as_ref() else {
            *state = RunState::Idle;
            return Err(RunError::InvalidState("no run configuration".to_string()));
        };

        if let Some(emitter) = emitter.as_ref() {
            emitter.batch_started(batch.start_id, batch.count, batch.manual);
        }

        let mut guard = RunningGuard::enter(state, last_failure, emitter.as_ref());
        let orchestrator = IterationOrchestrator::new(client.as_ref(), config, prompts).with_events(emitter.as_ref());
        let result = orchestrator.run_rounds(history, tokens, batch).await;

        match result {
            Ok(outcome) => {
                info!(
                    "Run paused after round {:?}: {} (score {:?})",
                    outcome.last_round, outcome.reason, outcome.last_score
                );
                guard.finish(RunState::Paused, None);
                *last_pause = Some(outcome.reason);
                if let Some(emitter) = emitter.as_ref() {
                    emitter.run_paused(outcome.reason, outcome.last_round, outcome.last_score);
                }
                Ok(outcome)
            }
            Err(err) => {
                error!(kind = %err.kind(), "Run failed: {}", err);
                let failure = RunFailure::from(&err);
                if let Some(emitter) = emitter.as_ref() {
                    emitter.run_failed(failure.kind, &failure.message);
                }
                guard.finish(RunState::Failed, Some(failure));
                Err(err)
            }
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &IterationHistory {
        &self.history
    }

    pub fn tokens(&self) -> &TokenAccountant {
        &self.tokens
    }

    pub fn config(&self) -> Option<&RunConfiguration> {
        self.config.as_ref()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// The failure that moved the run to `Failed`
    pub fn last_error(&self) -> Option<&RunFailure> {
        self.last_failure.as_ref()
    }

    /// Why the most recent batch paused
    pub fn last_pause(&self) -> Option<PauseReason> {
        self.last_pause
    }

    /// Content of the latest round's selected draft
    pub fn final_selected_draft(&self) -> Option<&str> {
        self.history
            .latest()
            .and_then(|r| r.selected_draft())
            .map(|d| d.content.as_str())
    }

    /// Latest consolidated feedback, the text an operator edits while paused
    pub fn pending_feedback(&self) -> Option<&str> {
        self.history.latest().and_then(|r| r.consolidated_feedback())
    }
}

/// Holds the run in `Running` for the duration of a batch
///
/// Dropped without `finish` (the batch future was cancelled), it marks the
/// run `Failed` with a recorded failure.
struct RunningGuard<'a> {
    state: &'a mut RunState,
    last_failure: &'a mut Option<RunFailure>,
    emitter: Option<&'a EventEmitter>,
    finished: bool,
}

impl<'a> RunningGuard<'a> {
    fn enter(
        state: &'a mut RunState,
        last_failure: &'a mut Option<RunFailure>,
        emitter: Option<&'a EventEmitter>,
    ) -> Self {
        *state = RunState::Running;
        Self {
            state,
            last_failure,
            emitter,
            finished: false,
        }
    }

    fn finish(&mut self, state: RunState, failure: Option<RunFailure>) {
        *self.state = state;
        if failure.is_some() {
            *self.last_failure = failure;
        }
        self.finished = true;
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Batch cancelled before it finished, marking run failed");
        let failure = RunFailure {
            kind: ErrorKind::TransportOther,
            message: "The run was interrupted before the batch finished.".to_string(),
        };
        if let Some(emitter) = self.emitter {
            emitter.run_failed(failure.kind, &failure.message);
        }
        *self.state = RunState::Failed;
        *self.last_failure = Some(failure);
    }
}
