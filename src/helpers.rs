//! Utility functions for playtest

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// 2D position on the level grid (x right, y down the map)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Absolute bearing from `self` to `other` (0 = +x, π/2 = +y)
    pub fn bearing_to(self, other: Vec2) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Fold an angle into (-π, π].
/// Repeated additive mouse updates otherwise grow the facing angle without bound.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Shortest signed rotation taking `from` onto `to`, in [-π, π]
pub fn shortest_angle_diff(from: f32, to: f32) -> f32 {
    let mut diff = to - from;
    while diff > PI {
        diff -= TAU;
    }
    while diff < -PI {
        diff += TAU;
    }
    diff
}
