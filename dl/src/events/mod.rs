//! Run progress events
//!
//! The controller and orchestrator emit a [`RunEvent`] for every observable
//! step of a run. Emission never blocks and never fails; a run works the same
//! with or without subscribers.
//!
//! ```rust,ignore
//! let bus = Arc::new(EventBus::with_default_capacity());
//! let mut rx = bus.subscribe();
//! let controller = RunController::new(client, prompts).with_events(bus.clone());
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter};
pub use types::RunEvent;
