//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Writer role system instruction
pub const WRITER_SYSTEM: &str = include_str!("../../prompts/writer-system.pmt");

/// Reviewer role system instruction
pub const REVIEWER_SYSTEM: &str = include_str!("../../prompts/reviewer-system.pmt");

/// First-round writer instruction
pub const WRITER_INITIAL: &str = include_str!("../../prompts/writer-initial.pmt");

/// Later-round writer instruction (excerpt + feedback)
pub const WRITER_REVISION: &str = include_str!("../../prompts/writer-revision.pmt");

/// Reviewer instruction (criteria + delimited drafts)
pub const REVIEWER: &str = include_str!("../../prompts/reviewer.pmt");

/// Names of every template the loop renders
pub const TEMPLATE_NAMES: [&str; 5] = [
    "writer-system",
    "reviewer-system",
    "writer-initial",
    "writer-revision",
    "reviewer",
];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "writer-system" => Some(WRITER_SYSTEM),
        "reviewer-system" => Some(REVIEWER_SYSTEM),
        "writer-initial" => Some(WRITER_INITIAL),
        "writer-revision" => Some(WRITER_REVISION),
        "reviewer" => Some(REVIEWER),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
