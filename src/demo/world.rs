//! Small voxel-ish world used by the demo suites
//!
//! Mobs walk in straight lines, lose air while standing in water and die
//! when it runs out. Lamps light up a fixed number of ticks after being
//! powered. Positions are integer block coordinates in host space.

use bevy::prelude::*;

use crate::host::headless_app;
use crate::scheduler::Placement;

/// Air a mob starts with; one point is lost per tick in water
pub const MAX_AIR: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobKind {
    Pig,
    Cow,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Mob {
    pub kind: MobKind,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position(pub IVec3);

/// Blocks moved per tick
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Velocity(pub IVec3);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Air(pub i32);

/// Axis-aligned block region, both corners inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub min: IVec3,
    pub max: IVec3,
}

impl Region {
    pub fn from_corners(a: [i32; 3], b: [i32; 3]) -> Self {
        let (a, b) = (IVec3::from_array(a), IVec3::from_array(b));
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, p: IVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Water(pub Region);

#[derive(Component, Debug, Clone, Copy)]
pub struct Pen(pub Region);

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Lamp {
    pub powered: bool,
    /// Powered ticks needed before the lamp lights
    pub delay: u32,
    pub charge: u32,
    pub lit: bool,
}

impl Lamp {
    pub fn with_delay(delay: u32) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }
}

/// Updates since the app was built
#[derive(Resource, Debug, Default)]
pub struct TickCount(pub u64);

/// Mob died; carries the block it died on
#[derive(Component, Debug, Clone, Copy)]
pub struct Drowned(pub IVec3);

fn count_ticks(mut ticks: ResMut<TickCount>) {
    ticks.0 += 1;
}

fn move_mobs(mut mobs: Query<(&mut Position, &Velocity), (With<Mob>, Without<Drowned>)>) {
    for (mut position, velocity) in &mut mobs {
        position.0 += velocity.0;
    }
}

fn drown_mobs(
    mut commands: Commands,
    water: Query<&Water>,
    mut mobs: Query<(Entity, &Position, &mut Air, &mut Velocity), (With<Mob>, Without<Drowned>)>,
) {
    for (entity, position, mut air, mut velocity) in &mut mobs {
        let submerged = water.iter().any(|w| w.0.contains(position.0));
        if !submerged {
            air.0 = MAX_AIR;
            continue;
        }
        // stuck once in water
        velocity.0 = IVec3::ZERO;
        air.0 -= 1;
        if air.0 <= 0 {
            commands.entity(entity).insert(Drowned(position.0));
        }
    }
}

fn update_lamps(mut lamps: Query<&mut Lamp>) {
    for mut lamp in &mut lamps {
        if !lamp.powered {
            lamp.charge = 0;
            lamp.lit = false;
            continue;
        }
        if !lamp.lit {
            lamp.charge += 1;
            lamp.lit = lamp.charge >= lamp.delay;
        }
    }
}

/// Fresh demo world for one attempt
pub fn demo_app(_placement: &Placement) -> App {
    let mut app = headless_app();
    app.init_resource::<TickCount>();
    app.add_systems(
        Update,
        (count_ticks, move_mobs, drown_mobs, update_lamps).chain(),
    );
    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Simulation;
    use crate::registry::Rotation;

    fn app() -> App {
        demo_app(&Placement::standalone("demo:world", Rotation::North))
    }

    #[test]
    fn test_region_contains_is_inclusive() {
        let region = Region::from_corners([3, 0, 3], [0, 2, 0]);
        assert!(region.contains(IVec3::new(0, 0, 0)));
        assert!(region.contains(IVec3::new(3, 2, 3)));
        assert!(!region.contains(IVec3::new(4, 0, 0)));
    }

    #[test]
    fn test_mob_walks_one_block_per_tick() {
        let mut app = app();
        let pig = app
            .world_mut()
            .spawn((
                Mob { kind: MobKind::Pig },
                Position(IVec3::ZERO),
                Velocity(IVec3::X),
                Air(MAX_AIR),
            ))
            .id();
        for _ in 0..3 {
            app.tick();
        }
        assert_eq!(app.world().get::<Position>(pig), Some(&Position(IVec3::new(3, 0, 0))));
        assert_eq!(app.world().resource::<TickCount>().0, 3);
    }

    #[test]
    fn test_mob_drowns_after_running_out_of_air() {
        let mut app = app();
        app.world_mut()
            .spawn(Water(Region::from_corners([0, 0, 0], [2, 0, 2])));
        let pig = app
            .world_mut()
            .spawn((
                Mob { kind: MobKind::Pig },
                Position(IVec3::ZERO),
                Velocity(IVec3::X),
                Air(MAX_AIR),
            ))
            .id();
        for _ in 0..MAX_AIR {
            app.tick();
        }
        assert!(app.world().get::<Drowned>(pig).is_some());
        // movement stops on entering water
        assert_eq!(app.world().get::<Position>(pig), Some(&Position(IVec3::new(1, 0, 0))));
    }

    #[test]
    fn test_lamp_lights_after_delay() {
        let mut app = app();
        let lamp = app.world_mut().spawn(Lamp::with_delay(3)).id();
        app.world_mut().get_mut::<Lamp>(lamp).unwrap().powered = true;
        for tick in 1..=3 {
            app.tick();
            let lit = app.world().get::<Lamp>(lamp).unwrap().lit;
            assert_eq!(lit, tick >= 3, "tick {}", tick);
        }
    }
}
