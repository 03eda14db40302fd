//! Cardinal rotation for rotated test instances

use serde::{Deserialize, Serialize};
use std::fmt;

/// Facing of a test instance, clockwise around the vertical axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    North,
    East,
    South,
    West,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::North,
        Rotation::East,
        Rotation::South,
        Rotation::West,
    ];

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::North => 0,
            Rotation::East => 90,
            Rotation::South => 180,
            Rotation::West => 270,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rotation::North => "north",
            Rotation::East => "east",
            Rotation::South => "south",
            Rotation::West => "west",
        }
    }

    /// Rotate a structure-relative (x, y, z) offset around y
    pub fn apply(self, [x, y, z]: [i32; 3]) -> [i32; 3] {
        match self {
            Rotation::North => [x, y, z],
            Rotation::East => [-z, y, x],
            Rotation::South => [-x, y, -z],
            Rotation::West => [z, y, -x],
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
