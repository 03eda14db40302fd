//! Lockstep execution of one batch
//!
//! Every active attempt of the batch advances by one tick per scheduler
//! round, each against its own simulation and clock. At most
//! `max_concurrent` attempts are active; the rest wait in a queue. A failed
//! attempt with retries left goes back to the front of the queue and starts
//! over on a fresh simulation.

use bevy::log::{debug, info};
use std::collections::VecDeque;

use crate::constants::DEFAULT_MAX_CONCURRENT;
use crate::context::AttemptInfo;
use crate::host::{Simulation, SimulationFactory};
use crate::registry::TestInstance;
use crate::report::CaseReport;

use super::attempt::AttemptRun;
use super::layout::{LayoutConfig, Placement, plan_batch};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent: usize,
    pub layout: LayoutConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            layout: LayoutConfig::default(),
        }
    }
}

/// Runs batches of instances against simulations built by `factory`
pub struct Scheduler<'f, F> {
    factory: &'f F,
    config: SchedulerConfig,
}

struct Active<'c, S> {
    instance: usize,
    run: AttemptRun<'c, S>,
}

impl<'f, F> Scheduler<'f, F> {
    pub fn new(factory: &'f F, config: SchedulerConfig) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run every instance (with retries) and return one report per instance,
    /// in input order
    pub fn run_batch<'c, S>(&self, instances: &[TestInstance<'c, S>]) -> Vec<CaseReport>
    where
        S: Simulation,
        F: SimulationFactory<S>,
    {
        let placements = plan_batch(instances, &self.config.layout);
        let mut reports: Vec<CaseReport> = instances.iter().map(CaseReport::for_instance).collect();
        let mut queue: VecDeque<(usize, u32)> = (0..instances.len()).map(|i| (i, 1)).collect();
        let mut active: Vec<Active<'c, S>> = Vec::new();
        let limit = self.config.max_concurrent.max(1);
        let mut rounds = 0u64;

        while !queue.is_empty() || !active.is_empty() {
            while active.len() < limit
                && let Some((index, attempt)) = queue.pop_front()
            {
                let run = self.start(&instances[index], &placements[index], &reports[index].id, attempt);
                active.push(Active { instance: index, run });
            }

            for entry in active.iter_mut() {
                entry.run.step();
            }
            rounds += 1;

            let mut i = 0;
            while i < active.len() {
                if !active[i].run.is_terminal() {
                    i += 1;
                    continue;
                }
                let Active { instance, run } = active.swap_remove(i);
                let record = run.into_record();
                let case = instances[instance].case;
                let report = &mut reports[instance];

                if record.outcome.is_failure() && record.attempt < case.config().max_attempts {
                    info!(
                        "{}: attempt {}/{} {}, retrying",
                        report.id,
                        record.attempt,
                        case.config().max_attempts,
                        record.outcome
                    );
                    queue.push_front((instance, record.attempt + 1));
                }
                report.attempts.push(record);
            }
        }

        debug!("batch of {} instances finished in {} rounds", instances.len(), rounds);
        reports
    }

    fn start<'c, S>(
        &self,
        instance: &TestInstance<'c, S>,
        placement: &Placement,
        test_id: &str,
        attempt: u32,
    ) -> AttemptRun<'c, S>
    where
        S: Simulation,
        F: SimulationFactory<S>,
    {
        let sim = self.factory.create(placement);
        let info = AttemptInfo {
            test_id: test_id.to_string(),
            attempt,
            placement: placement.clone(),
        };
        AttemptRun::start(instance.case, sim, info)
    }
}

/// Run one instance on its own, attempts one after another
pub fn run_case<S, F>(instance: &TestInstance<'_, S>, factory: &F) -> CaseReport
where
    S: Simulation,
    F: SimulationFactory<S>,
{
    let scheduler = Scheduler::new(factory, SchedulerConfig::default());
    scheduler
        .run_batch(std::slice::from_ref(instance))
        .pop()
        .unwrap_or_else(|| CaseReport::for_instance(instance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ActionResult, pending};
    use crate::context::TestContext;
    use crate::host::test_sim::{TestWorld, fresh};
    use crate::registry::{CaseFilter, Registry};
    use crate::scheduler::Outcome;
    use crate::sequence::SequenceBuilder;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn noop(_: &mut TestContext<'_, TestWorld>) -> ActionResult {
        Ok(())
    }

    #[test]
    fn test_always_failing_case_runs_exactly_max_attempts() {
        let mut registry: Registry<TestWorld> = Registry::new();
        registry
            .register("retry", "always_fails", noop)
            .max_attempts(3)
            .start_sequence(SequenceBuilder::<TestWorld>::new().then_idle(2).then_fail("still broken"))
            .finish()
            .unwrap();
        let instances = registry.instances(&CaseFilter::default());
        let report = run_case(&instances[0], &fresh);

        assert_eq!(report.attempts.len(), 3);
        for (i, record) in report.attempts.iter().enumerate() {
            assert_eq!(record.attempt, i as u32 + 1);
            // each attempt gets a fresh clock starting at 0
            assert!(matches!(record.outcome, Outcome::Failure { tick: 2, .. }));
            assert_eq!(record.ticks, 2);
        }
        assert!(!report.passed());
    }

    #[test]
    fn test_retry_stops_at_first_success() {
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let mut registry: Registry<TestWorld> = Registry::new();
        registry
            .register("retry", "flaky", noop)
            .max_attempts(5)
            .succeed_when(move |ctx| {
                if ctx.attempt() < 2 {
                    return Err(ctx.fail("first attempt loses").into());
                }
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .finish()
            .unwrap();
        let instances = registry.instances(&CaseFilter::default());
        let report = run_case(&instances[0], &fresh);

        assert_eq!(report.attempts.len(), 2);
        assert!(report.passed());
        assert!(report.is_flaky());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_attempt_gets_a_fresh_simulation() {
        let created = Mutex::new(Vec::new());
        let factory = |placement: &Placement| {
            created.lock().unwrap().push(placement.structure_name.clone());
            TestWorld::default()
        };
        let mut registry: Registry<TestWorld> = Registry::new();
        registry
            .register("retry", "counts_host", noop)
            .max_attempts(2)
            .max_ticks(3)
            .start_sequence(SequenceBuilder::<TestWorld>::new().then_wait(|ctx| {
                ctx.assert(ctx.sim().ticks == ctx.tick(), "host reused")?;
                Err(pending("never"))
            }))
            .finish()
            .unwrap();
        let instances = registry.instances(&CaseFilter::default());
        let report = run_case(&instances[0], &factory);

        assert_eq!(created.lock().unwrap().len(), 2);
        assert!(
            report
                .attempts
                .iter()
                .all(|a| matches!(a.outcome, Outcome::Timeout { tick: 3, .. }))
        );
    }

    #[test]
    fn test_batch_runs_in_lockstep_and_reports_in_input_order() {
        let mut registry: Registry<TestWorld> = Registry::new();
        for (name, idle) in [("slow", 9u64), ("fast", 2), ("medium", 5)] {
            registry
                .register("lockstep", name, noop)
                .start_sequence(SequenceBuilder::<TestWorld>::new().then_idle(idle).then_succeed())
                .finish()
                .unwrap();
        }
        let instances = registry.instances(&CaseFilter::default());
        let scheduler = Scheduler::new(&fresh, SchedulerConfig::default());
        let reports = scheduler.run_batch(&instances);

        let ids: Vec<_> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["lockstep:slow", "lockstep:fast", "lockstep:medium"]);
        let ticks: Vec<_> = reports.iter().map(|r| r.final_outcome().tick()).collect();
        assert_eq!(ticks, [Some(9), Some(2), Some(5)]);
    }

    #[test]
    fn test_max_concurrent_limits_active_attempts() {
        let live = std::sync::Arc::new(AtomicU32::new(0));
        let peak = std::sync::Arc::new(AtomicU32::new(0));
        let mut registry: Registry<TestWorld> = Registry::new();
        for i in 0..5 {
            let live_setup = live.clone();
            let peak_setup = peak.clone();
            let live_done = live.clone();
            registry
                .register("limit", format!("case_{}", i), move |_: &mut TestContext<'_, TestWorld>| {
                    let now = live_setup.fetch_add(1, Ordering::SeqCst) + 1;
                    peak_setup.fetch_max(now, Ordering::SeqCst);
                    Ok(())
                })
                .start_sequence(SequenceBuilder::<TestWorld>::new().then_idle(3).then_execute(move |_| {
                    live_done.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }).then_succeed())
                .finish()
                .unwrap();
        }
        let instances = registry.instances(&CaseFilter::default());
        let config = SchedulerConfig {
            max_concurrent: 2,
            ..Default::default()
        };
        let reports = Scheduler::new(&fresh, config).run_batch(&instances);

        assert!(reports.iter().all(CaseReport::passed));
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_batch_placements_do_not_overlap() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let mut registry: Registry<TestWorld> = Registry::new();
        for i in 0..4 {
            let seen = seen.clone();
            registry
                .register("layout", format!("case_{}", i), move |ctx: &mut TestContext<'_, TestWorld>| {
                    seen.lock().unwrap().push(ctx.placement().clone());
                    Ok(())
                })
                .padding(3)
                .succeed_when(|_| Ok(()))
                .finish()
                .unwrap();
        }
        let instances = registry.instances(&CaseFilter::default());
        Scheduler::new(&fresh, SchedulerConfig::default()).run_batch(&instances);

        let placements = seen.lock().unwrap();
        assert_eq!(placements.len(), 4);
        for (i, a) in placements.iter().enumerate() {
            for b in placements.iter().skip(i + 1) {
                assert!(!a.overlaps(b));
            }
        }
    }
}
