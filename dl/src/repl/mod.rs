//! Terminal interaction for paused runs
//!
//! Status printing for run events and the readline session offered when a
//! run pauses.

mod session;

pub use session::{PauseSession, SessionCommand, print_batch_result, print_event, print_history, print_tokens};
