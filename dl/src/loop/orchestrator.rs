//! Iteration orchestrator
//!
//! Runs a batch of writer/reviewer rounds against a model client. Each round:
//! build the writer instruction, call the writer, validate, build the reviewer
//! instruction from the drafts, call the reviewer, validate, resolve the
//! selected score, append a record, and (in automatic mode) ask the policy
//! whether to keep going.
//!
//! Calls are strictly sequential: the reviewer for round N needs the writer's
//! validated drafts for round N, and round N+1 needs round N's review.

use tracing::{debug, info, warn};

use super::accountant::TokenAccountant;
use super::policy::decide;
use crate::domain::{IterationHistory, IterationRecord, PauseReason, ReviewerOutput, RoleTokens, RunConfiguration};
use crate::error::{Role, RunError};
use crate::events::EventEmitter;
use crate::llm::{ContentPart, GenerateRequest, GenerateResponse, ModelClient};
use crate::prompts::{PromptLoader, ReviewerPromptContext, WriterPromptContext};
use crate::validation::{Violation, inspect_reviewer, inspect_writer, reviewer_schema, writer_schema};

/// Excerpt text used when no earlier round has a usable selected draft
pub const NO_SELECTED_DRAFT: &str = "No previously selected draft content.";

/// Feedback text used when no earlier round produced feedback
pub const NO_PRIOR_FEEDBACK: &str = "No prior review feedback.";

/// Parameters for one batch of rounds
#[derive(Debug, Clone, Copy)]
pub struct Batch<'f> {
    /// Id of the first round in the batch
    pub start_id: u32,
    /// Rounds to run at most
    pub count: u32,
    /// Manual batches skip the convergence policy
    pub manual: bool,
    /// Replaces the carried-forward feedback for the first round of a manual batch
    pub feedback_override: Option<&'f str>,
}

impl<'f> Batch<'f> {
    /// An automatic batch starting at round 1
    pub fn automatic(count: u32) -> Self {
        Self {
            start_id: 1,
            count,
            manual: false,
            feedback_override: None,
        }
    }

    /// A manual batch continuing at `start_id`
    pub fn manual(start_id: u32, count: u32, feedback_override: Option<&'f str>) -> Self {
        Self {
            start_id,
            count,
            manual: true,
            feedback_override,
        }
    }
}

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records appended to history by this batch
    pub appended: u32,
    pub reason: PauseReason,
    /// Id of the last round that completed
    pub last_round: Option<u32>,
    /// Resolved score of the last round that completed
    pub last_score: Option<u8>,
}

/// Drives rounds for one run; borrows everything it needs for one batch
pub struct IterationOrchestrator<'a> {
    client: &'a dyn ModelClient,
    config: &'a RunConfiguration,
    prompts: &'a PromptLoader,
    events: Option<&'a EventEmitter>,
}

impl<'a> IterationOrchestrator<'a> {
    pub fn new(client: &'a dyn ModelClient, config: &'a RunConfiguration, prompts: &'a PromptLoader) -> Self {
        debug!(model = %config.model_name, "IterationOrchestrator::new: called");
        Self {
            client,
            config,
            prompts,
            events: None,
        }
    }

    /// Builder: emit progress events through `emitter`
    pub fn with_events(mut self, emitter: Option<&'a EventEmitter>) -> Self {
        self.events = emitter;
        self
    }

    fn emit(&self, f: impl FnOnce(&EventEmitter)) {
        if let Some(emitter) = self.events {
            f(emitter);
        }
    }

    /// Run up to `batch.count` rounds, appending one record per completed round
    ///
    /// On error the history keeps every round completed before the failure.
    pub async fn run_rounds(
        &self,
        history: &mut IterationHistory,
        accountant: &mut TokenAccountant,
        batch: Batch<'_>,
    ) -> Result<BatchOutcome, RunError> {
        debug!(
            start_id = batch.start_id,
            count = batch.count,
            manual = batch.manual,
            has_override = batch.feedback_override.is_some(),
            "run_rounds: called"
        );

        let writer_system = self
            .prompts
            .system_prompt(Role::Writer)
            .map_err(|e| RunError::Prompt(e.to_string()))?;
        let reviewer_system = self
            .prompts
            .system_prompt(Role::Reviewer)
            .map_err(|e| RunError::Prompt(e.to_string()))?;

        let mut outcome = BatchOutcome {
            appended: 0,
            reason: PauseReason::BatchComplete,
            last_round: None,
            last_score: None,
        };

        for r in 0..batch.count {
            let round = batch.start_id + r;
            let feedback_override = if batch.manual && r == 0 {
                batch.feedback_override
            } else {
                None
            };
            info!("Round {}: writer generating {} drafts", round, self.config.draft_count);

            // Writer
            let writer_instruction = self.writer_instruction(history, feedback_override)?;
            self.emit(|e| e.writer_started(round, self.config.draft_count));
            let response = self
                .call(Role::Writer, round, &writer_instruction, &writer_system, writer_schema(self.config.draft_count))
                .await?;
            let writer_tokens = RoleTokens::from_usage(&response.usage);
            accountant.record(&writer_tokens);

            let writer_output = inspect_writer(&response.text, self.config.draft_count)
                .map_err(|v| malformed(Role::Writer, round, v, response.text))?;
            self.emit(|e| e.writer_completed(round, writer_tokens));

            // Reviewer
            info!("Round {}: reviewer scoring {} drafts", round, writer_output.drafts.len());
            let context = ReviewerPromptContext::new(
                self.config.reviewer_criteria.as_str(),
                writer_output.drafts.iter().map(|d| d.content.as_str()),
            );
            let reviewer_instruction = self
                .prompts
                .reviewer_instruction(&context)
                .map_err(|e| RunError::Prompt(e.to_string()))?;
            self.emit(|e| e.reviewer_started(round));
            let response = self
                .call(
                    Role::Reviewer,
                    round,
                    &reviewer_instruction,
                    &reviewer_system,
                    reviewer_schema(self.config.draft_count),
                )
                .await?;
            let reviewer_tokens = RoleTokens::from_usage(&response.usage);
            accountant.record(&reviewer_tokens);

            let reviewer_output = inspect_reviewer(&response.text, self.config.draft_count)
                .map_err(|v| malformed(Role::Reviewer, round, v, response.text))?;

            let score = resolved_score(&reviewer_output, round);
            let selected_index = reviewer_output.selected_index;
            self.emit(|e| e.reviewer_completed(round, selected_index, score, reviewer_tokens));

            history.append(
                IterationRecord::new(round, writer_instruction, writer_output, writer_tokens)
                    .with_review(reviewer_output, reviewer_tokens),
            );
            outcome.appended += 1;
            outcome.last_round = Some(round);
            outcome.last_score = Some(score);
            self.emit(|e| e.round_recorded(round, score));
            info!("Round {}: selected draft {} scored {}", round, selected_index + 1, score);

            if !batch.manual
                && let Some(reason) = decide(score, round, self.config, false).pause_reason()
            {
                debug!(round, ?reason, "run_rounds: policy paused the run");
                outcome.reason = reason;
                return Ok(outcome);
            }
        }

        debug!(appended = outcome.appended, "run_rounds: batch complete");
        Ok(outcome)
    }

    /// Build the writer instruction for the next round
    ///
    /// The first round of a run gets the brief alone. Later rounds carry
    /// forward the latest round's selected draft (as an excerpt) and its
    /// consolidated feedback, unless an override replaces the feedback.
    pub fn writer_instruction(&self, history: &IterationHistory, feedback_override: Option<&str>) -> Result<String, RunError> {
        let context = match history.latest() {
            None => {
                debug!("writer_instruction: first round");
                WriterPromptContext::initial(self.config.writer_brief.as_str(), self.config.draft_count)
            }
            Some(latest) => {
                let excerpt = latest
                    .selected_draft()
                    .map(|d| excerpt(&d.content, self.config.excerpt_chars))
                    .unwrap_or_else(|| NO_SELECTED_DRAFT.to_string());
                let feedback = match feedback_override {
                    Some(text) => {
                        debug!(round = latest.id, "writer_instruction: using feedback override");
                        text.to_string()
                    }
                    None => latest
                        .consolidated_feedback()
                        .filter(|f| !f.trim().is_empty())
                        .unwrap_or(NO_PRIOR_FEEDBACK)
                        .to_string(),
                };
                WriterPromptContext::revision(
                    self.config.writer_brief.as_str(),
                    self.config.draft_count,
                    excerpt,
                    feedback,
                )
            }
        };

        self.prompts
            .writer_instruction(&context)
            .map_err(|e| RunError::Prompt(e.to_string()))
    }

    async fn call(
        &self,
        role: Role,
        round: u32,
        instruction: &str,
        system_instruction: &str,
        response_schema: serde_json::Value,
    ) -> Result<GenerateResponse, RunError> {
        let mut parts = self.config.background_material.clone();
        parts.push(ContentPart::text(instruction));
        debug!(%role, round, part_count = parts.len(), "call: sending request");

        let request = GenerateRequest {
            model: self.config.model_name.clone(),
            parts,
            system_instruction: system_instruction.to_string(),
            response_schema,
        };

        self.client.generate(request).await.map_err(|source| {
            warn!(%role, round, error = %source, "call: transport failed");
            RunError::Transport { role, round, source }
        })
    }
}

/// Leading `max_chars` characters of `content`, marked when truncated
pub fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Score of the selected draft; an unusable selection counts as 0
fn resolved_score(review: &ReviewerOutput, round: u32) -> u8 {
    review.selected_score().unwrap_or_else(|| {
        warn!(
            round,
            selected_index = review.selected_index,
            review_count = review.draft_reviews.len(),
            "resolved_score: selected index out of range, using score 0"
        );
        0
    })
}

fn malformed(role: Role, round: u32, violation: Violation, raw: String) -> RunError {
    warn!(%role, round, %violation, "malformed response");
    RunError::ResponseMalformed {
        role,
        round,
        reason: violation.to_string(),
        raw,
    }
}
