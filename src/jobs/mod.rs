pub mod poller;
pub mod scheduler;

pub use poller::{CycleOutcome, CycleReport, Poller, PollerOptions, PollerState};
pub use scheduler::PollScheduler;
