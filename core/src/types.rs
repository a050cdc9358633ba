//! Shared primitive types used across the entire session.

use serde::{Deserialize, Serialize};

/// A logical controller tick. One tick = one `step()` call.
pub type Tick = u64;

/// Server-side frame number reported after a world tick.
pub type FrameId = u64;

/// Server-assigned actor identifier.
pub type ActorId = u32;

/// A point in world space, metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar distance, ignoring height.
    pub fn distance_2d(&self, other: &Location) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw:   f64,
    pub roll:  f64,
}

/// Location plus orientation. Spawn points are transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Location,
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(location: Location, yaw: f64) -> Self {
        Self {
            location,
            rotation: Rotation { yaw, ..Rotation::default() },
        }
    }
}
