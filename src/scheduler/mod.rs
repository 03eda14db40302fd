//! Attempt execution: the per-attempt state machine, batch lockstep
//! scheduling with retries, and spatial layout of concurrent instances

pub mod attempt;
pub mod batch;
pub mod layout;
pub mod outcome;

pub use attempt::{AttemptRecord, AttemptRun, Phase, run_attempt};
pub use batch::{Scheduler, SchedulerConfig, run_case};
pub use layout::{LayoutConfig, Placement, plan_batch};
pub use outcome::{Outcome, OutcomeSlot};
