//! DraftLoop - writer/reviewer refinement loop
//!
//! DraftLoop drives two roles of a generative model against each other. The
//! writer produces a few candidate drafts from a brief; the reviewer scores
//! them, picks the best and writes consolidated feedback; the next round
//! revises the picked draft using that feedback. Runs stop when the picked
//! draft reaches a target score (after a minimum number of rounds) or when
//! the round limit is hit, and can then be continued by hand.
//!
//! # Modules
//!
//! - [`domain`] - drafts, reviews, iteration records, run configuration
//! - [`validation`] - repair and validation of model replies, response schemas
//! - [`r#loop`] - orchestrator, convergence policy, token accounting, controller
//! - [`llm`] - model client trait and Gemini implementation
//! - [`prompts`] - role instructions as handlebars templates
//! - [`events`] - run progress events
//! - [`background`] - loading background material
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod background;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod llm;
pub mod prompts;
pub mod repl;
pub mod validation;

// Note: 'loop' is a reserved keyword, so we use r#loop
#[path = "loop/mod.rs"]
pub mod r#loop;

// Re-export commonly used types
pub use config::{Config, LlmConfig, RunDefaults};
pub use domain::{
    DraftCandidate, DraftReview, IterationHistory, IterationRecord, PauseReason, ReviewerOutput, RoleTokens,
    RunConfiguration, RunState, WriterOutput,
};
pub use error::{ErrorKind, Role, RunError, RunFailure};
pub use events::{EventBus, RunEvent};
pub use llm::{ContentPart, GenerateRequest, GenerateResponse, LlmError, ModelClient, UsageMetadata};
pub use prompts::PromptLoader;
pub use r#loop::{BatchOutcome, RunController, TokenAccountant};
