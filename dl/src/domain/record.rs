//! IterationRecord domain type
//!
//! Immutable record of one completed round (writer call + reviewer call), and
//! the append-only history those records live in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DraftCandidate, ReviewerOutput, WriterOutput};
use crate::llm::UsageMetadata;

/// Input/output token counts for one model call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTokens {
    pub input: u64,
    pub output: u64,
}

impl RoleTokens {
    /// Derive token counts from transport usage metadata
    ///
    /// Output is `total - input` when a total is reported and is not smaller
    /// than the input count; otherwise output counts as 0.
    pub fn from_usage(usage: &UsageMetadata) -> Self {
        let input = usage.input_tokens.unwrap_or(0);
        let output = match usage.total_tokens {
            Some(total) if total > 0 && total >= input => total - input,
            Some(total) if total > 0 => {
                warn!(input, total, "RoleTokens::from_usage: total below input, counting 0 output tokens");
                0
            }
            _ => 0,
        };
        debug!(input, output, "RoleTokens::from_usage: derived");
        Self { input, output }
    }
}

/// Persistent record of a single round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Round number, 1-based, monotonically increasing across the run
    pub id: u32,

    /// The exact instruction text sent to the writer
    pub writer_instruction: String,

    pub writer_output: WriterOutput,

    pub writer_tokens: RoleTokens,

    pub reviewer_output: Option<ReviewerOutput>,

    pub reviewer_tokens: RoleTokens,

    /// When the round completed
    pub created_at: DateTime<Utc>,
}

impl IterationRecord {
    /// Create a record for a round whose writer call has completed
    pub fn new(id: u32, writer_instruction: impl Into<String>, writer_output: WriterOutput, writer_tokens: RoleTokens) -> Self {
        debug!(id, "IterationRecord::new: called");
        Self {
            id,
            writer_instruction: writer_instruction.into(),
            writer_output,
            writer_tokens,
            reviewer_output: None,
            reviewer_tokens: RoleTokens::default(),
            created_at: Utc::now(),
        }
    }

    /// Builder: attach the reviewer's reply
    pub fn with_review(mut self, reviewer_output: ReviewerOutput, reviewer_tokens: RoleTokens) -> Self {
        debug!(id = self.id, "IterationRecord::with_review");
        self.reviewer_output = Some(reviewer_output);
        self.reviewer_tokens = reviewer_tokens;
        self
    }

    /// The draft the reviewer selected, if the selection is usable
    pub fn selected_draft(&self) -> Option<&DraftCandidate> {
        let idx = self.reviewer_output.as_ref()?.selected()?;
        self.writer_output.drafts.get(idx)
    }

    /// Score of the selected draft, if the selection is usable
    pub fn selected_score(&self) -> Option<u8> {
        self.reviewer_output.as_ref()?.selected_score()
    }

    /// The consolidated feedback this round produced
    pub fn consolidated_feedback(&self) -> Option<&str> {
        self.reviewer_output.as_ref().map(|r| r.consolidated_feedback.as_str())
    }

    /// Tokens consumed by both calls of this round
    pub fn total_tokens(&self) -> RoleTokens {
        RoleTokens {
            input: self.writer_tokens.input + self.reviewer_tokens.input,
            output: self.writer_tokens.output + self.reviewer_tokens.output,
        }
    }
}

/// Append-only, chronologically ordered log of completed rounds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IterationHistory {
    records: Vec<IterationRecord>,
}

impl IterationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed round; ids must keep increasing
    pub fn append(&mut self, record: IterationRecord) {
        debug!(id = record.id, len = self.records.len(), "IterationHistory::append: called");
        debug_assert!(
            self.latest().is_none_or(|last| record.id > last.id),
            "round ids must increase monotonically"
        );
        self.records.push(record);
    }

    /// Most recent record, the source of carried-forward draft and feedback
    pub fn latest(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    /// Id the next round will get
    pub fn next_round_id(&self) -> u32 {
        self.latest().map(|r| r.id + 1).unwrap_or(1)
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IterationRecord> {
        self.records.iter()
    }
}
