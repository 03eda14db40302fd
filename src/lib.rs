//! GameTest - tick-synchronized scenario tests against a live simulation
//!
//! Cases are registered into a [`Registry`] with a setup closure and one or
//! more step [`Sequence`]s. A [`Scheduler`] drives every attempt one tick at a
//! time against a fresh simulation and records Success, Failure or Timeout,
//! retrying up to `max_attempts`.

// Orchestrator core
pub mod clock;
pub mod condition;
pub mod constants;
pub mod context;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod sequence;

// Hosts, reporting and the runner
pub mod demo;
pub mod host;
pub mod report;
pub mod runner;

// Re-export commonly used types for convenience
pub use clock::Clock;
pub use condition::{
    ActionResult, AssertionError, CheckError, CheckResult, ensure, ensure_eq, pending, ready_when,
};
pub use constants::*;
pub use context::{AttemptInfo, TestContext};
pub use error::ConfigError;
pub use host::{Simulation, SimulationFactory, headless_app};
pub use registry::{CaseBuilder, CaseConfig, CaseFilter, Registry, Rotation, TestCase, TestId, TestInstance};
pub use report::{CaseReport, RunSummary, StatusCounts};
pub use runner::{HistoryDatabase, RunConfig, run_registry};
pub use scheduler::{
    AttemptRecord, LayoutConfig, Outcome, Placement, Scheduler, SchedulerConfig, run_attempt,
    run_case,
};
pub use sequence::{Sequence, SequenceBuilder};
