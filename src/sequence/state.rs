//! Per-attempt execution state of one sequence
//!
//! `NotStarted -> Running(step) -> {Finished | Succeeded | Failed}`. A step is
//! due at `anchor + offset`, where the anchor is the tick the previous step
//! resolved on. At most one evaluating step (execute, wait, execute_for) runs
//! per tick; idle and terminal steps resolve without using that slot.

use crate::condition::{AssertionError, CheckError};
use crate::context::TestContext;

use super::builder::Sequence;
use super::step::StepKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceStatus {
    NotStarted,
    Running { step: usize },
    /// Ran out of steps without a terminal step
    Finished,
    Succeeded,
    Failed(AssertionError),
}

impl SequenceStatus {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SequenceStatus::Finished | SequenceStatus::Succeeded | SequenceStatus::Failed(_)
        )
    }
}

/// What changed during one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Still running (or already settled earlier)
    Continue,
    Finished,
    Succeeded,
    Failed(AssertionError),
}

#[derive(Debug, Clone)]
pub struct SequenceRun {
    status: SequenceStatus,
    anchor: u64,
    /// Ticks already run inside an execute_for window
    window_runs: u64,
    last_pending: Option<String>,
}

impl Default for SequenceRun {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceRun {
    pub fn new() -> Self {
        Self {
            status: SequenceStatus::NotStarted,
            anchor: 0,
            window_runs: 0,
            last_pending: None,
        }
    }

    pub fn status(&self) -> &SequenceStatus {
        &self.status
    }

    /// Reason the current wait step last reported as pending
    pub fn last_pending(&self) -> Option<&str> {
        self.last_pending.as_deref()
    }

    fn resolve(&mut self, index: usize, tick: u64) {
        self.anchor = tick;
        self.window_runs = 0;
        self.last_pending = None;
        self.status = SequenceStatus::Running { step: index + 1 };
    }

    fn fail(&mut self, error: AssertionError, tick: u64) -> Progress {
        let error = error.at_tick(tick);
        self.status = SequenceStatus::Failed(error.clone());
        Progress::Failed(error)
    }

    /// Evaluate whatever is due on the context's tick
    pub fn evaluate<S>(&mut self, sequence: &Sequence<S>, ctx: &mut TestContext<'_, S>) -> Progress {
        let now = ctx.tick();
        if self.status == SequenceStatus::NotStarted {
            self.anchor = now;
            self.status = SequenceStatus::Running { step: 0 };
        }

        let mut evaluated = false;
        loop {
            let SequenceStatus::Running { step: index } = self.status else {
                return Progress::Continue;
            };
            let Some(step) = sequence.steps().get(index) else {
                self.status = SequenceStatus::Finished;
                return Progress::Finished;
            };
            let due = self.anchor.saturating_add(step.offset);

            match &step.kind {
                StepKind::Succeed => {
                    self.status = SequenceStatus::Succeeded;
                    return Progress::Succeeded;
                }
                StepKind::Fail(reason) => {
                    return self.fail(AssertionError::new(reason.clone()), now);
                }
                StepKind::Idle => {
                    if now < due {
                        return Progress::Continue;
                    }
                    self.resolve(index, due);
                }
                StepKind::Execute(action) => {
                    if evaluated || now < due {
                        return Progress::Continue;
                    }
                    evaluated = true;
                    if let Err(error) = action(ctx) {
                        return self.fail(error, now);
                    }
                    self.resolve(index, now);
                }
                StepKind::Wait(condition) => {
                    if evaluated || now < due {
                        return Progress::Continue;
                    }
                    evaluated = true;
                    match condition(ctx) {
                        Ok(()) => self.resolve(index, now),
                        Err(CheckError::Pending(reason)) => {
                            self.last_pending = Some(reason);
                            return Progress::Continue;
                        }
                        Err(CheckError::Failed(error)) => return self.fail(error, now),
                    }
                }
                StepKind::ExecuteFor { duration, action } => {
                    if evaluated || now < due {
                        return Progress::Continue;
                    }
                    evaluated = true;
                    if let Err(error) = action(ctx) {
                        return self.fail(error, now);
                    }
                    self.window_runs += 1;
                    if self.window_runs < *duration {
                        return Progress::Continue;
                    }
                    self.resolve(index, now);
                }
            }
        }
    }
}
