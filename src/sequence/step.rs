//! Step definitions

use std::fmt;
use std::sync::Arc;

use crate::condition::{ActionResult, CheckResult};
use crate::context::TestContext;

/// One-shot or repeated side effect; any error fails the sequence
pub type Action<S> = Arc<dyn Fn(&mut TestContext<'_, S>) -> ActionResult + Send + Sync>;

/// Polled predicate; `Pending` keeps polling, `Failed` fails the sequence
pub type Condition<S> = Arc<dyn Fn(&mut TestContext<'_, S>) -> CheckResult + Send + Sync>;

pub(crate) enum StepKind<S> {
    Execute(Action<S>),
    Wait(Condition<S>),
    Idle,
    ExecuteFor { duration: u64, action: Action<S> },
    Succeed,
    Fail(String),
}

/// A scheduled unit of work, immutable once appended
pub struct Step<S> {
    /// Ticks after the previous step resolved before this one is due
    pub(crate) offset: u64,
    pub(crate) kind: StepKind<S>,
}

impl<S> Step<S> {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            StepKind::Execute(_) => "execute",
            StepKind::Wait(_) => "wait",
            StepKind::Idle => "idle",
            StepKind::ExecuteFor { .. } => "execute_for",
            StepKind::Succeed => "succeed",
            StepKind::Fail(_) => "fail",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StepKind::Succeed | StepKind::Fail(_))
    }
}

impl<S> fmt::Debug for Step<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.label())
            .field("offset", &self.offset)
            .finish()
    }
}
