//! Step sequences: declarative plans of delayed actions and polled conditions

pub mod builder;
pub mod state;
pub mod step;

pub use builder::{Sequence, SequenceBuilder};
pub use state::{Progress, SequenceRun, SequenceStatus};
pub use step::{Action, Condition, Step};
