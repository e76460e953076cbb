//! Run configuration and run state

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RunDefaults;
use crate::error::RunError;
use crate::llm::ContentPart;

/// Highest draft count a run may request
pub const MAX_DRAFT_COUNT: u8 = 3;

/// User-supplied parameters for a run
///
/// Immutable once a run starts; the controller holds its own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfiguration {
    /// Identifier of the generative model
    pub model_name: String,

    /// Rounds that must complete before convergence can pause the run
    pub min_iterations: u32,

    /// Automatic-mode round limit
    pub max_iterations: u32,

    /// Selected-draft score (0-100) that counts as converged
    pub target_score: u8,

    /// Drafts the writer produces per round (1-3)
    pub draft_count: u8,

    /// Opaque parts passed verbatim to both roles ahead of the instruction
    pub background_material: Vec<ContentPart>,

    /// What the writer should produce
    pub writer_brief: String,

    /// How the reviewer should judge
    pub reviewer_criteria: String,

    /// Characters of the previously selected draft quoted in revision instructions
    pub excerpt_chars: usize,
}

impl RunConfiguration {
    /// Create a configuration with default run parameters
    pub fn new(model_name: impl Into<String>, writer_brief: impl Into<String>, reviewer_criteria: impl Into<String>) -> Self {
        Self::from_defaults(&RunDefaults::default(), model_name, writer_brief, reviewer_criteria)
    }

    /// Create a configuration seeded from config-file defaults
    pub fn from_defaults(
        defaults: &RunDefaults,
        model_name: impl Into<String>,
        writer_brief: impl Into<String>,
        reviewer_criteria: impl Into<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            min_iterations: defaults.min_iterations,
            max_iterations: defaults.max_iterations,
            target_score: defaults.target_score,
            draft_count: defaults.draft_count,
            background_material: Vec::new(),
            writer_brief: writer_brief.into(),
            reviewer_criteria: reviewer_criteria.into(),
            excerpt_chars: defaults.excerpt_chars,
        }
    }

    /// Builder: set both iteration bounds
    pub fn with_iterations(mut self, min_iterations: u32, max_iterations: u32) -> Self {
        self.min_iterations = min_iterations;
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_target_score(mut self, target_score: u8) -> Self {
        self.target_score = target_score;
        self
    }

    pub fn with_draft_count(mut self, draft_count: u8) -> Self {
        self.draft_count = draft_count;
        self
    }

    pub fn with_background(mut self, parts: Vec<ContentPart>) -> Self {
        self.background_material = parts;
        self
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    /// Check the configuration before any round is attempted
    pub fn validate(&self) -> Result<(), RunError> {
        debug!(
            model = %self.model_name,
            min = self.min_iterations,
            max = self.max_iterations,
            target = self.target_score,
            drafts = self.draft_count,
            "RunConfiguration::validate: called"
        );

        let invalid = |msg: String| Err(RunError::ConfigurationInvalid(msg));

        if self.model_name.trim().is_empty() {
            return invalid("Model name must not be empty".to_string());
        }
        if self.min_iterations < 1 {
            return invalid("Minimum iterations must be at least 1".to_string());
        }
        if self.max_iterations < self.min_iterations {
            return invalid(format!(
                "Maximum iterations ({}) must be at least the minimum ({})",
                self.max_iterations, self.min_iterations
            ));
        }
        if self.target_score > 100 {
            return invalid(format!("Target score {} must be between 0 and 100", self.target_score));
        }
        if self.draft_count < 1 || self.draft_count > MAX_DRAFT_COUNT {
            return invalid(format!(
                "Draft count {} must be between 1 and {}",
                self.draft_count, MAX_DRAFT_COUNT
            ));
        }
        if self.excerpt_chars < 1 {
            return invalid("Excerpt length must be at least 1 character".to_string());
        }
        if self.writer_brief.trim().is_empty() {
            return invalid("Writer brief must not be empty".to_string());
        }
        if self.reviewer_criteria.trim().is_empty() {
            return invalid("Reviewer criteria must not be empty".to_string());
        }
        Ok(())
    }
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No run has started, or the run was reset
    #[default]
    Idle,

    /// A batch of rounds is executing
    Running,

    /// The last batch ended; history is available and manual rounds may follow
    Paused,

    /// A round failed; history holds the rounds completed before the failure
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Why a batch stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// Selected score met the target after the minimum rounds
    Converged,

    /// The automatic round limit was reached
    Exhausted,

    /// A manual batch ran all of its requested rounds
    BatchComplete,
}

impl std::fmt::Display for PauseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PauseReason::Converged => "target score reached",
            PauseReason::Exhausted => "maximum iterations reached",
            PauseReason::BatchComplete => "manual batch complete",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn valid() -> RunConfiguration {
        RunConfiguration::new("gemini-2.5-flash", "Write a haiku about rust", "Imagery and meter")
    }

    fn assert_invalid(config: RunConfiguration) {
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    }

    #[test]
    fn test_defaults() {
        let config = valid();
        assert_eq!(config.min_iterations, 2);
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.target_score, 80);
        assert_eq!(config.draft_count, 2);
        assert_eq!(config.excerpt_chars, 300);
        assert!(config.background_material.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_defaults() {
        let defaults = RunDefaults {
            min_iterations: 1,
            max_iterations: 9,
            target_score: 70,
            draft_count: 3,
            excerpt_chars: 120,
        };
        let config = RunConfiguration::from_defaults(&defaults, "m", "b", "c");
        assert_eq!(config.max_iterations, 9);
        assert_eq!(config.draft_count, 3);
        assert_eq!(config.excerpt_chars, 120);
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        assert_invalid(valid().with_iterations(0, 5));
        assert_invalid(valid().with_iterations(4, 3));
        assert!(valid().with_iterations(3, 3).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_target() {
        assert_invalid(valid().with_target_score(101));
        assert!(valid().with_target_score(0).validate().is_ok());
        assert!(valid().with_target_score(100).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_draft_count() {
        assert_invalid(valid().with_draft_count(0));
        assert_invalid(valid().with_draft_count(4));
        assert!(valid().with_draft_count(1).validate().is_ok());
        assert!(valid().with_draft_count(3).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        assert_invalid(RunConfiguration::new("  ", "brief", "criteria"));
        assert_invalid(RunConfiguration::new("m", "", "criteria"));
        assert_invalid(RunConfiguration::new("m", "brief", "\n\t"));
        assert_invalid(valid().with_excerpt_chars(0));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RunState::default(), RunState::Idle);
        assert_eq!(RunState::Paused.to_string(), "paused");
        assert_eq!(PauseReason::Converged.to_string(), "target score reached");
    }
}
