//! Run a registry: select, group into batches, schedule, collect reports
//!
//! Distinct batches are independent and may run on a rayon pool. Each worker
//! builds its own simulations through the factory, so the simulation type
//! never crosses threads.

pub mod config;
pub mod history;

pub use config::{ArgAction, RunConfig, print_help};
pub use history::{FlakyCase, HistoryDatabase, RunRecord};

use bevy::log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::host::{Simulation, SimulationFactory};
use crate::registry::{Registry, TestInstance};
use crate::report::{CaseReport, RunSummary};
use crate::scheduler::{Scheduler, SchedulerConfig};

/// Selected instances grouped by batch, in batch-name order, shuffled
/// within each batch when a seed is set
pub fn plan_run<'r, S: Simulation>(
    registry: &'r Registry<S>,
    config: &RunConfig,
) -> Vec<(String, Vec<TestInstance<'r, S>>)> {
    let mut batches: Vec<_> = registry.batches(&config.case_filter()).into_iter().collect();
    if let Some(seed) = config.seed {
        let mut rng = StdRng::seed_from_u64(seed);
        for (_, instances) in batches.iter_mut() {
            instances.shuffle(&mut rng);
        }
    }
    batches
}

/// Run every selected case and summarize
pub fn run_registry<S, F>(registry: &Registry<S>, factory: &F, config: &RunConfig) -> RunSummary
where
    S: Simulation,
    F: SimulationFactory<S>,
{
    let mut summary = RunSummary::begin();
    let batches = plan_run(registry, config);
    let scheduler_config = config.scheduler_config();
    let total: usize = batches.iter().map(|(_, instances)| instances.len()).sum();
    info!(
        "run {}: {} instances in {} batches",
        summary.run_id,
        total,
        batches.len()
    );

    let reports = if config.parallel > 0 && batches.len() > 1 {
        run_parallel(&batches, factory, &scheduler_config, config.parallel)
    } else {
        run_sequential(&batches, factory, &scheduler_config)
    };

    summary.cases = reports.into_iter().flatten().collect();
    summary.finish();
    summary
}

fn run_batch<S, F>(
    name: &str,
    instances: &[TestInstance<'_, S>],
    factory: &F,
    config: &SchedulerConfig,
) -> Vec<CaseReport>
where
    S: Simulation,
    F: SimulationFactory<S>,
{
    info!("batch '{}': {} instances", name, instances.len());
    Scheduler::new(factory, config.clone()).run_batch(instances)
}

fn run_sequential<S, F>(
    batches: &[(String, Vec<TestInstance<'_, S>>)],
    factory: &F,
    config: &SchedulerConfig,
) -> Vec<Vec<CaseReport>>
where
    S: Simulation,
    F: SimulationFactory<S>,
{
    batches
        .iter()
        .map(|(name, instances)| run_batch(name, instances, factory, config))
        .collect()
}

fn run_parallel<S, F>(
    batches: &[(String, Vec<TestInstance<'_, S>>)],
    factory: &F,
    config: &SchedulerConfig,
    threads: usize,
) -> Vec<Vec<CaseReport>>
where
    S: Simulation,
    F: SimulationFactory<S>,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| {
            batches
                .par_iter()
                .map(|(name, instances)| run_batch(name, instances, factory, config))
                .collect()
        }),
        Err(e) => {
            warn!("Failed to build thread pool ({}), running batches sequentially", e);
            run_sequential(batches, factory, config)
        }
    }
}
