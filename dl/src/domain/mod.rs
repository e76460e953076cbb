//! Domain types for DraftLoop
//!
//! Draft/review outputs, iteration records, and run configuration.

mod draft;
mod record;
mod run;

pub use draft::{DraftCandidate, DraftReview, ReviewerOutput, WriterOutput};
pub use record::{IterationHistory, IterationRecord, RoleTokens};
pub use run::{MAX_DRAFT_COUNT, PauseReason, RunConfiguration, RunState};
