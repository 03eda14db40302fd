//! Spatial layout of concurrently running instances
//!
//! Instances of one batch share a host coordinate space. Each gets a grid cell
//! sized to the structure footprint plus its padding on every side, so padded
//! regions never overlap.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FOOTPRINT, DEFAULT_TESTS_PER_ROW};
use crate::registry::{Rotation, TestInstance};

/// Where one instance lives in host space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Minimum corner of the structure (padding excluded)
    pub origin: [i32; 3],
    /// Structure extent; x and z are equal so rotation keeps the box
    pub size: [u32; 3],
    pub rotation: Rotation,
    pub padding: u32,
    pub structure_name: String,
}

impl Placement {
    /// Placement at the host origin, for running a single instance
    pub fn standalone(structure_name: impl Into<String>, rotation: Rotation) -> Self {
        let side = DEFAULT_FOOTPRINT[0].max(DEFAULT_FOOTPRINT[2]);
        Self {
            origin: [0, 0, 0],
            size: [side, DEFAULT_FOOTPRINT[1], side],
            rotation,
            padding: 0,
            structure_name: structure_name.into(),
        }
    }

    /// Map a structure-relative position to host coordinates
    pub fn to_world(&self, relative: [i32; 3]) -> [i32; 3] {
        let edge = self.size[0] as i32 - 1;
        let [x, y, z] = self.rotation.apply(relative);
        let (shift_x, shift_z) = match self.rotation {
            Rotation::North => (0, 0),
            Rotation::East => (edge, 0),
            Rotation::South => (edge, edge),
            Rotation::West => (0, edge),
        };
        [
            self.origin[0] + x + shift_x,
            self.origin[1] + y,
            self.origin[2] + z + shift_z,
        ]
    }

    /// Padded region as (min inclusive, max exclusive)
    pub fn padded_bounds(&self) -> ([i32; 3], [i32; 3]) {
        let pad = self.padding as i32;
        let min = [self.origin[0] - pad, self.origin[1], self.origin[2] - pad];
        let max = [
            self.origin[0] + self.size[0] as i32 + pad,
            self.origin[1] + self.size[1] as i32,
            self.origin[2] + self.size[2] as i32 + pad,
        ];
        (min, max)
    }

    pub fn overlaps(&self, other: &Placement) -> bool {
        let (a_min, a_max) = self.padded_bounds();
        let (b_min, b_max) = other.padded_bounds();
        (0..3).all(|axis| a_min[axis] < b_max[axis] && b_min[axis] < a_max[axis])
    }
}

/// Grid parameters for a batch
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub origin: [i32; 3],
    pub footprint: [u32; 3],
    pub tests_per_row: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin: [0, 0, 0],
            footprint: DEFAULT_FOOTPRINT,
            tests_per_row: DEFAULT_TESTS_PER_ROW,
        }
    }
}

/// Assign a placement to every instance, in order
pub fn plan_batch<S>(instances: &[TestInstance<'_, S>], layout: &LayoutConfig) -> Vec<Placement> {
    let side = layout.footprint[0].max(layout.footprint[2]);
    let height = layout.footprint[1];
    let per_row = layout.tests_per_row.max(1);

    let mut placements = Vec::with_capacity(instances.len());
    let mut cursor_x = layout.origin[0];
    let mut row_z = layout.origin[2];
    let mut row_depth = 0i32;

    for (i, instance) in instances.iter().enumerate() {
        if i > 0 && i % per_row == 0 {
            row_z += row_depth;
            cursor_x = layout.origin[0];
            row_depth = 0;
        }

        let config = instance.case.config();
        let pad = config.padding as i32;
        let cell = side as i32 + 2 * pad;

        placements.push(Placement {
            origin: [cursor_x + pad, layout.origin[1], row_z + pad],
            size: [side, height, side],
            rotation: instance.rotation,
            padding: config.padding,
            structure_name: instance.case.structure_name(),
        });

        cursor_x += cell;
        row_depth = row_depth.max(cell);
    }

    placements
}
