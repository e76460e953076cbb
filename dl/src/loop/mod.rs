//! Iteration loop for DraftLoop
//!
//! A run alternates writer and reviewer calls round after round. The
//! orchestrator executes rounds, the policy decides when an automatic run has
//! converged or run out of rounds, the accountant keeps token totals, and the
//! controller owns the run and its state machine:
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --continue--> Running
//!                    |                                       |
//!                    +--------------failure------------------+--> Failed
//! any --reset--> Idle
//! ```

mod accountant;
mod controller;
mod orchestrator;
mod policy;

pub use accountant::TokenAccountant;
pub use controller::RunController;
pub use orchestrator::{Batch, BatchOutcome, IterationOrchestrator, NO_PRIOR_FEEDBACK, NO_SELECTED_DRAFT, excerpt};
pub use policy::{Decision, decide};
