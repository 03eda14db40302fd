//! Single-attempt state machine: `Setup -> Active -> Terminal`

use bevy::log::debug;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::condition::{AssertionError, CheckError};
use crate::context::{AttemptInfo, TestContext};
use crate::host::Simulation;
use crate::registry::TestCase;
use crate::sequence::{Progress, SequenceRun};

use super::outcome::{Outcome, OutcomeSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Host ticks left before the clock starts
    Setup { remaining: u64 },
    Active,
    Terminal,
}

/// What one attempt ended with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based
    pub attempt: u32,
    pub outcome: Outcome,
    /// Active ticks elapsed (setup ticks excluded)
    pub ticks: u64,
}

/// One attempt of one case against its own simulation instance
pub struct AttemptRun<'c, S> {
    case: &'c TestCase<S>,
    sim: S,
    clock: Clock,
    info: AttemptInfo,
    phase: Phase,
    runs: Vec<SequenceRun>,
    outcome: OutcomeSlot,
}

impl<'c, S: Simulation> AttemptRun<'c, S> {
    /// Run the setup closure and enter `Setup` (or `Active` when no setup ticks)
    pub fn start(case: &'c TestCase<S>, mut sim: S, info: AttemptInfo) -> Self {
        let mut outcome = OutcomeSlot::default();
        let setup_result = {
            let mut ctx = TestContext::new(&mut sim, 0, &info);
            (case.setup())(&mut ctx)
        };
        let phase = match setup_result {
            Err(error) => {
                debug!("{} attempt {}: setup failed: {}", info.test_id, info.attempt, error);
                outcome.record(Outcome::Failure {
                    tick: 0,
                    error: error.at_tick(0),
                });
                Phase::Terminal
            }
            Ok(()) if case.config().setup_ticks > 0 => Phase::Setup {
                remaining: case.config().setup_ticks,
            },
            Ok(()) => Phase::Active,
        };

        Self {
            case,
            sim,
            clock: Clock::new(),
            info,
            phase,
            runs: vec![SequenceRun::new(); case.sequences().len()],
            outcome,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Terminal
    }

    pub fn outcome(&self) -> &Outcome {
        self.outcome.get()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn info(&self) -> &AttemptInfo {
        &self.info
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// Advance by one scheduler tick. No-op once terminal.
    pub fn step(&mut self) {
        match self.phase {
            Phase::Terminal => {}
            Phase::Setup { remaining } => {
                self.sim.tick();
                self.phase = if remaining > 1 {
                    Phase::Setup {
                        remaining: remaining - 1,
                    }
                } else {
                    Phase::Active
                };
            }
            Phase::Active => self.step_active(),
        }
    }

    fn step_active(&mut self) {
        let now = self.clock.now();
        let mut failure: Option<AssertionError> = None;
        let mut succeeded = false;

        {
            let mut ctx = TestContext::new(&mut self.sim, now, &self.info);
            for (run, sequence) in self.runs.iter_mut().zip(self.case.sequences()) {
                if run.status().is_settled() {
                    continue;
                }
                match run.evaluate(sequence, &mut ctx) {
                    Progress::Failed(error) => {
                        failure.get_or_insert(error);
                    }
                    Progress::Succeeded => succeeded = true,
                    Progress::Continue | Progress::Finished => {}
                }
            }
        }

        if let Some(error) = failure {
            self.finish(Outcome::Failure { tick: now, error });
        } else if succeeded {
            self.finish(Outcome::Success { tick: now });
        } else if now >= self.case.config().max_ticks {
            let outcome = self.deadline(now);
            self.finish(outcome);
        } else {
            self.sim.tick();
            self.clock.advance();
        }
    }

    /// Outcome when `max_ticks` is reached without a terminal step
    fn deadline(&mut self, now: u64) -> Outcome {
        let checks = self.case.deadline_checks();
        if checks.is_empty() {
            let last_pending = self
                .runs
                .iter()
                .find_map(|run| run.last_pending().map(str::to_string));
            return Outcome::Timeout {
                tick: now,
                last_pending,
            };
        }

        let mut ctx = TestContext::new(&mut self.sim, now, &self.info);
        for check in checks {
            match check(&mut ctx) {
                Ok(()) => {}
                Err(CheckError::Pending(reason)) => {
                    return Outcome::Failure {
                        tick: now,
                        error: AssertionError::new(format!(
                            "succeed_if not satisfied at tick {}: {}",
                            now, reason
                        ))
                        .at_tick(now),
                    };
                }
                Err(CheckError::Failed(error)) => {
                    return Outcome::Failure {
                        tick: now,
                        error: error.at_tick(now),
                    };
                }
            }
        }
        Outcome::Success { tick: now }
    }

    fn finish(&mut self, outcome: Outcome) {
        debug!(
            "{} attempt {}: {}",
            self.info.test_id, self.info.attempt, outcome
        );
        self.outcome.record(outcome);
        self.phase = Phase::Terminal;
    }

    pub fn into_record(self) -> AttemptRecord {
        AttemptRecord {
            attempt: self.info.attempt,
            ticks: self.clock.now(),
            outcome: self.outcome.into_inner(),
        }
    }
}

/// Drive one attempt to its terminal outcome
pub fn run_attempt<S: Simulation>(case: &TestCase<S>, sim: S, info: AttemptInfo) -> AttemptRecord {
    let mut run = AttemptRun::start(case, sim, info);
    while !run.is_terminal() {
        run.step();
    }
    run.into_record()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ActionResult, ensure, pending};
    use crate::host::test_sim::TestWorld;
    use crate::registry::{Registry, Rotation, TestId};
    use crate::scheduler::Placement;
    use crate::sequence::SequenceBuilder;

    fn noop(_: &mut TestContext<'_, TestWorld>) -> ActionResult {
        Ok(())
    }

    fn info(attempt: u32) -> AttemptInfo {
        AttemptInfo {
            test_id: "attempt:unit".to_string(),
            attempt,
            placement: Placement::standalone("attempt:unit", Rotation::North),
        }
    }

    fn run(registry: &Registry<TestWorld>, id: &TestId) -> AttemptRecord {
        let case = registry.get(id).unwrap();
        run_attempt(case, TestWorld::default(), info(1))
    }

    #[test]
    fn test_wait_that_never_holds_times_out_exactly_at_max_ticks() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "never", noop)
            .max_ticks(10)
            .start_sequence(
                SequenceBuilder::<TestWorld>::new()
                    .then_wait(|_| Err(pending("never ready")))
                    .then_succeed(),
            )
            .finish()
            .unwrap();
        let record = run(&registry, &id);
        assert_eq!(
            record.outcome,
            Outcome::Timeout {
                tick: 10,
                last_pending: Some("never ready".to_string())
            }
        );
        assert_eq!(record.ticks, 10);
    }

    #[test]
    fn test_wait_after_past_deadline_is_never_observed_true() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "late", noop)
            .max_ticks(10)
            .start_sequence(SequenceBuilder::<TestWorld>::new().then_wait_after(5, |ctx| {
                let tick = ctx.tick();
                ctx.sim_mut().log.push(tick);
                ctx.wait_until(tick >= 12, "condA false")
            }))
            .finish()
            .unwrap();
        let case = registry.get(&id).unwrap();
        let mut attempt = AttemptRun::start(case, TestWorld::default(), info(1));
        while !attempt.is_terminal() {
            attempt.step();
        }
        assert_eq!(attempt.sim().log, [5, 6, 7, 8, 9, 10]);
        assert!(matches!(attempt.outcome(), Outcome::Timeout { tick: 10, .. }));
    }

    #[test]
    fn test_execute_then_wait_succeeds_on_following_tick() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "flag", noop)
            .start_sequence(
                SequenceBuilder::<TestWorld>::new()
                    .then_execute(|ctx| {
                        ctx.sim_mut().flag = true;
                        Ok(())
                    })
                    .then_wait(|ctx| ctx.wait_until(ctx.sim().flag, "flag unset"))
                    .then_succeed(),
            )
            .finish()
            .unwrap();
        assert_eq!(run(&registry, &id).outcome, Outcome::Success { tick: 1 });
    }

    #[test]
    fn test_idle_then_succeed_lands_on_exact_tick() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "idle", noop)
            .start_sequence(SequenceBuilder::<TestWorld>::new().then_idle(7).then_succeed())
            .finish()
            .unwrap();
        assert_eq!(run(&registry, &id).outcome, Outcome::Success { tick: 7 });
    }

    #[test]
    fn test_failure_beats_success_on_same_tick() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "race", noop)
            .succeed_when(|ctx| ctx.wait_until(ctx.tick() >= 4, "pig inside"))
            .fail_if(|ctx| ctx.wait_until(ctx.tick() >= 4, "pig dry"))
            .finish()
            .unwrap();
        let record = run(&registry, &id);
        match record.outcome {
            Outcome::Failure { tick, error } => {
                assert_eq!(tick, 4);
                assert_eq!(error.message, "fail_if condition held");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_earlier_failure_wins_race() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "drowns_first", noop)
            .succeed_when(|ctx| ctx.wait_until(ctx.tick() >= 6, "pig inside"))
            .fail_if(|ctx| ctx.wait_until(ctx.tick() >= 3, "pig dry"))
            .finish()
            .unwrap();
        assert!(matches!(run(&registry, &id).outcome, Outcome::Failure { tick: 3, .. }));
    }

    #[test]
    fn test_huge_idle_after_first_tick_times_out() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "forever", noop)
            .max_ticks(10)
            .start_sequence(
                SequenceBuilder::<TestWorld>::new()
                    .then_idle(1)
                    .then_idle(u64::MAX)
                    .then_succeed(),
            )
            .finish()
            .unwrap();
        assert_eq!(
            run(&registry, &id).outcome,
            Outcome::Timeout {
                tick: 10,
                last_pending: None
            }
        );
    }

    #[test]
    fn test_earlier_success_wins_race() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "escape", noop)
            .succeed_when(|ctx| ctx.wait_until(ctx.tick() >= 3, "pig inside"))
            .fail_if(|ctx| ctx.wait_until(ctx.tick() >= 6, "pig dry"))
            .finish()
            .unwrap();
        assert_eq!(run(&registry, &id).outcome, Outcome::Success { tick: 3 });
    }

    #[test]
    fn test_setup_ticks_advance_host_before_clock_starts() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "settle", noop)
            .setup_ticks(5)
            .start_sequence(SequenceBuilder::<TestWorld>::new().then_execute(|ctx| {
                let seen = ctx.sim().ticks;
                ctx.sim_mut().value = seen as i64;
                Ok(())
            }))
            .max_ticks(3)
            .finish()
            .unwrap();
        let case = registry.get(&id).unwrap();
        let mut attempt = AttemptRun::start(case, TestWorld::default(), info(1));
        assert_eq!(attempt.phase(), Phase::Setup { remaining: 5 });
        for _ in 0..5 {
            attempt.step();
        }
        assert_eq!(attempt.phase(), Phase::Active);
        assert_eq!(attempt.now(), 0);
        attempt.step();
        assert_eq!(attempt.sim().value, 5);
    }

    #[test]
    fn test_setup_failure_ends_attempt_before_active() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "broken", |ctx: &mut TestContext<'_, TestWorld>| {
                Err(ctx.fail("structure missing"))
            })
            .setup_ticks(3)
            .succeed_when(|_| Ok(()))
            .finish()
            .unwrap();
        let case = registry.get(&id).unwrap();
        let attempt = AttemptRun::start(case, TestWorld::default(), info(1));
        assert!(attempt.is_terminal());
        assert_eq!(attempt.sim().ticks, 0);
        assert!(matches!(attempt.outcome(), Outcome::Failure { tick: 0, error } if error.message == "structure missing"));
    }

    #[test]
    fn test_succeed_if_checks_once_at_deadline() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "deadline", noop)
            .max_ticks(6)
            .succeed_if(|ctx| {
                let tick = ctx.tick();
                ctx.sim_mut().log.push(tick);
                ensure(ctx.sim().ticks == 6, "world did not settle")?;
                Ok(())
            })
            .finish()
            .unwrap();
        let case = registry.get(&id).unwrap();
        let mut attempt = AttemptRun::start(case, TestWorld::default(), info(1));
        while !attempt.is_terminal() {
            attempt.step();
        }
        assert_eq!(attempt.sim().log, [6]);
        assert_eq!(attempt.outcome(), &Outcome::Success { tick: 6 });
    }

    #[test]
    fn test_unsatisfied_succeed_if_is_failure_not_timeout() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "dark", noop)
            .max_ticks(4)
            .succeed_if(|_| Err(pending("lamp dark")))
            .finish()
            .unwrap();
        let record = run(&registry, &id);
        assert!(matches!(record.outcome, Outcome::Failure { tick: 4, .. }));
    }

    #[test]
    fn test_case_without_sequences_times_out() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry.register("attempt", "empty", noop).max_ticks(2).finish().unwrap();
        assert_eq!(
            run(&registry, &id).outcome,
            Outcome::Timeout {
                tick: 2,
                last_pending: None
            }
        );
    }

    #[test]
    fn test_terminal_attempt_ignores_further_steps() {
        let mut registry: Registry<TestWorld> = Registry::new();
        let id = registry
            .register("attempt", "done", noop)
            .start_sequence(SequenceBuilder::<TestWorld>::new().then_succeed())
            .finish()
            .unwrap();
        let case = registry.get(&id).unwrap();
        let mut attempt = AttemptRun::start(case, TestWorld::default(), info(1));
        attempt.step();
        assert_eq!(attempt.outcome(), &Outcome::Success { tick: 0 });
        let host_ticks = attempt.sim().ticks;
        attempt.step();
        attempt.step();
        assert_eq!(attempt.sim().ticks, host_ticks);
        assert_eq!(attempt.outcome(), &Outcome::Success { tick: 0 });
    }
}
