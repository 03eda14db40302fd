//! Fluent sequence builder
//!
//! ```ignore
//! let seq = SequenceBuilder::new()
//!     .then_execute(|ctx| press_button(ctx))
//!     .then_wait_after(2, |ctx| door_open(ctx))
//!     .then_succeed();
//! ```

use std::sync::Arc;

use crate::condition::{ActionResult, CheckResult};
use crate::context::TestContext;
use crate::error::ConfigError;

use super::step::{Step, StepKind};

/// Ordered list of steps, validated at build time
pub struct Sequence<S> {
    steps: Vec<Step<S>>,
}

impl<S> Sequence<S> {
    pub fn steps(&self) -> &[Step<S>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Accumulates steps; each `then_*` call consumes and returns the builder
pub struct SequenceBuilder<S> {
    steps: Vec<Step<S>>,
    error: Option<ConfigError>,
}

impl<S> Default for SequenceBuilder<S> {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            error: None,
        }
    }
}

impl<S: 'static> SequenceBuilder<S> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, offset: u64, kind: StepKind<S>) -> Self {
        let index = self.steps.len();
        if self.error.is_none() {
            if self.steps.last().is_some_and(|s| s.is_terminal()) {
                self.error = Some(ConfigError::StepAfterTerminal { index });
            } else if let StepKind::ExecuteFor { duration: 0, .. } = kind {
                self.error = Some(ConfigError::ZeroDuration { index });
            }
        }
        self.steps.push(Step { offset, kind });
        self
    }

    /// Run `action` once, right after the previous step resolves
    pub fn then_execute<F>(self, action: F) -> Self
    where
        F: Fn(&mut TestContext<'_, S>) -> ActionResult + Send + Sync + 'static,
    {
        self.then_execute_after(0, action)
    }

    /// Run `action` once, `ticks` after the previous step resolved
    pub fn then_execute_after<F>(self, ticks: u64, action: F) -> Self
    where
        F: Fn(&mut TestContext<'_, S>) -> ActionResult + Send + Sync + 'static,
    {
        self.push(ticks, StepKind::Execute(Arc::new(action)))
    }

    /// Let `ticks` pass without evaluating anything
    pub fn then_idle(self, ticks: u64) -> Self {
        self.push(ticks, StepKind::Idle)
    }

    /// Poll `condition` every tick until it is satisfied
    pub fn then_wait<F>(self, condition: F) -> Self
    where
        F: Fn(&mut TestContext<'_, S>) -> CheckResult + Send + Sync + 'static,
    {
        self.then_wait_after(0, condition)
    }

    /// Start polling `condition` once `ticks` have passed
    pub fn then_wait_after<F>(self, ticks: u64, condition: F) -> Self
    where
        F: Fn(&mut TestContext<'_, S>) -> CheckResult + Send + Sync + 'static,
    {
        self.push(ticks, StepKind::Wait(Arc::new(condition)))
    }

    /// Run `action` on each of the next `duration` ticks
    pub fn then_execute_for<F>(self, duration: u64, action: F) -> Self
    where
        F: Fn(&mut TestContext<'_, S>) -> ActionResult + Send + Sync + 'static,
    {
        self.push(
            0,
            StepKind::ExecuteFor {
                duration,
                action: Arc::new(action),
            },
        )
    }

    /// Mark the attempt successful when reached
    pub fn then_succeed(self) -> Self {
        self.push(0, StepKind::Succeed)
    }

    /// Mark the attempt failed when reached
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.push(0, StepKind::Fail(reason.into()))
    }

    pub fn build(self) -> Result<Sequence<S>, ConfigError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.steps.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        Ok(Sequence { steps: self.steps })
    }
}
