//! Per-call view handed to setup closures, actions and conditions

use crate::condition::{AssertionError, CheckError, CheckResult};
use crate::registry::Rotation;
use crate::scheduler::Placement;

/// Identity of the attempt a context belongs to
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    pub test_id: String,
    /// 1-based attempt number
    pub attempt: u32,
    pub placement: Placement,
}

/// Access to the live simulation for one step evaluation
pub struct TestContext<'a, S> {
    sim: &'a mut S,
    tick: u64,
    info: &'a AttemptInfo,
}

impl<'a, S> TestContext<'a, S> {
    pub fn new(sim: &'a mut S, tick: u64, info: &'a AttemptInfo) -> Self {
        Self { sim, tick, info }
    }

    pub fn sim(&self) -> &S {
        &*self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut *self.sim
    }

    /// Active tick (0 during setup)
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn attempt(&self) -> u32 {
        self.info.attempt
    }

    pub fn test_id(&self) -> &str {
        &self.info.test_id
    }

    pub fn rotation(&self) -> Rotation {
        self.info.placement.rotation
    }

    pub fn placement(&self) -> &Placement {
        &self.info.placement
    }

    /// Structure-relative position to host coordinates
    pub fn to_world(&self, relative: [i32; 3]) -> [i32; 3] {
        self.info.placement.to_world(relative)
    }

    /// Assertion error stamped with the current tick
    pub fn fail(&self, message: impl Into<String>) -> AssertionError {
        AssertionError::new(message).at_tick(self.tick)
    }

    /// Hard assertion, stamped with the current tick
    pub fn assert(&self, cond: bool, message: impl Into<String>) -> Result<(), AssertionError> {
        if cond { Ok(()) } else { Err(self.fail(message)) }
    }

    /// Pending until `cond` holds
    pub fn wait_until(&self, cond: bool, reason: impl Into<String>) -> CheckResult {
        if cond {
            Ok(())
        } else {
            Err(CheckError::Pending(reason.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_sim::TestWorld;

    fn info() -> AttemptInfo {
        AttemptInfo {
            test_id: "ctx:probe".to_string(),
            attempt: 2,
            placement: Placement::standalone("ctx:probe", Rotation::East),
        }
    }

    #[test]
    fn test_context_exposes_attempt_identity() {
        let info = info();
        let mut world = TestWorld::default();
        let ctx = TestContext::new(&mut world, 7, &info);
        assert_eq!(ctx.tick(), 7);
        assert_eq!(ctx.attempt(), 2);
        assert_eq!(ctx.test_id(), "ctx:probe");
        assert_eq!(ctx.rotation(), Rotation::East);
    }

    #[test]
    fn test_fail_is_stamped_with_tick() {
        let info = info();
        let mut world = TestWorld::default();
        let ctx = TestContext::new(&mut world, 12, &info);
        let err = ctx.assert(false, "nope").unwrap_err();
        assert_eq!(err.tick, Some(12));
    }

    #[test]
    fn test_sim_mut_writes_through() {
        let info = info();
        let mut world = TestWorld::default();
        {
            let mut ctx = TestContext::new(&mut world, 0, &info);
            ctx.sim_mut().flag = true;
        }
        assert!(world.flag);
    }
}
