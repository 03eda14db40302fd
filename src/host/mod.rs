//! Simulation host boundary
//!
//! The orchestrator never looks inside the simulated world. It only asks the
//! host to advance by one tick and hands the host to user closures through
//! [`TestContext`](crate::context::TestContext).

pub mod bevy_app;

pub use bevy_app::headless_app;

use crate::scheduler::Placement;

/// A world that advances in discrete ticks
pub trait Simulation: 'static {
    /// Advance the world by one tick
    fn tick(&mut self);
}

/// Builds a fresh simulation for every attempt
pub trait SimulationFactory<S>: Send + Sync {
    fn create(&self, placement: &Placement) -> S;
}

impl<S, F> SimulationFactory<S> for F
where
    F: Fn(&Placement) -> S + Send + Sync,
{
    fn create(&self, placement: &Placement) -> S {
        self(placement)
    }
}

/// Minimal in-crate world for orchestrator tests
#[cfg(test)]
pub(crate) mod test_sim {
    use super::Simulation;
    use crate::scheduler::Placement;

    #[derive(Debug, Default)]
    pub struct TestWorld {
        /// Host ticks seen by this instance
        pub ticks: u64,
        pub flag: bool,
        pub value: i64,
        /// Active tick stamps written by actions
        pub log: Vec<u64>,
    }

    impl Simulation for TestWorld {
        fn tick(&mut self) {
            self.ticks += 1;
        }
    }

    pub fn fresh(_placement: &Placement) -> TestWorld {
        TestWorld::default()
    }
}
