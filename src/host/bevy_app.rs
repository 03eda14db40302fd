//! Headless bevy `App` as a simulation host
//!
//! One tick is one `App::update`. Every attempt gets its own app, so the task
//! pool is kept to a single thread to stay clear of OS thread limits when many
//! attempts (and rayon workers) are alive at once.

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use std::time::Duration;

use crate::context::TestContext;

use super::Simulation;

/// Nominal tick rate; only used to configure the schedule runner
pub const TICKS_PER_SECOND: f64 = 20.0;

impl Simulation for App {
    fn tick(&mut self) {
        self.update();
    }
}

/// App with minimal plugins, ready to be driven by manual updates
pub fn headless_app() -> App {
    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins
            .set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / TICKS_PER_SECOND,
            )))
            .set(TaskPoolPlugin {
                task_pool_options: TaskPoolOptions::with_num_threads(1),
            }),
    );
    app.finish();
    app.cleanup();
    app
}

/// World access for cases running against a bevy app
impl TestContext<'_, App> {
    pub fn world(&self) -> &World {
        self.sim().world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.sim_mut().world_mut()
    }

    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Entity {
        self.world_mut().spawn(bundle).id()
    }

    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        self.world().get::<C>(entity)
    }

    pub fn resource<R: Resource>(&self) -> Option<&R> {
        self.world().get_resource::<R>()
    }

    /// Number of live entities with component `C`
    pub fn count<C: Component>(&mut self) -> usize {
        let world = self.world_mut();
        let mut query = world.query::<&C>();
        query.iter(world).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ActionResult;
    use crate::context::AttemptInfo;
    use crate::registry::{CaseFilter, Registry, Rotation};
    use crate::scheduler::{Outcome, Placement, run_case};
    use crate::sequence::SequenceBuilder;

    #[derive(Resource, Default)]
    struct Updates(u64);

    #[derive(Component)]
    struct Marker;

    fn counting_app(_: &Placement) -> App {
        let mut app = headless_app();
        app.init_resource::<Updates>();
        app.add_systems(Update, |mut updates: ResMut<Updates>| updates.0 += 1);
        app
    }

    #[test]
    fn test_tick_runs_one_update() {
        let mut app = counting_app(&Placement::standalone("host:probe", Rotation::North));
        for _ in 0..3 {
            app.tick();
        }
        assert_eq!(app.world().resource::<Updates>().0, 3);
    }

    #[test]
    fn test_context_spawns_and_counts() {
        let mut app = headless_app();
        let info = AttemptInfo {
            test_id: "host:probe".to_string(),
            attempt: 1,
            placement: Placement::standalone("host:probe", Rotation::North),
        };
        let mut ctx = TestContext::new(&mut app, 0, &info);
        let entity = ctx.spawn(Marker);
        ctx.spawn(Marker);
        assert_eq!(ctx.count::<Marker>(), 2);
        assert!(ctx.get::<Marker>(entity).is_some());
        assert!(ctx.resource::<Updates>().is_none());
    }

    #[test]
    fn test_case_runs_against_app() {
        fn setup(ctx: &mut TestContext<'_, App>) -> ActionResult {
            ctx.spawn(Marker);
            Ok(())
        }

        let mut registry: Registry<App> = Registry::new();
        registry
            .register("host", "updates", setup)
            .start_sequence(
                SequenceBuilder::<App>::new()
                    .then_idle(4)
                    .then_execute(|ctx| {
                        let updates = ctx.resource::<Updates>().map(|u| u.0).unwrap_or(0);
                        ctx.assert(updates == 4, format!("expected 4 updates, saw {}", updates))
                    })
                    .then_succeed(),
            )
            .finish()
            .unwrap();
        let instances = registry.instances(&CaseFilter::default());
        let report = run_case(&instances[0], &counting_app);
        assert_eq!(report.final_outcome(), &Outcome::Success { tick: 4 });
    }
}
