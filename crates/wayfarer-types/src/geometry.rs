//! Minimal 3D vector used for positions and headings.
//!
//! The engine only needs distances and directions, so this stays a plain
//! `Copy` struct rather than pulling in a linear algebra crate. `y` is up;
//! agents steer on the horizontal (`x`/`z`) plane.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point or direction in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vec3 {
    /// East-west axis.
    pub x: f32,
    /// Vertical axis.
    pub y: f32,
    /// North-south axis.
    pub z: f32,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a vector from components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared euclidean distance to `other`.
    pub fn distance_squared(self, other: Self) -> f32 {
        let d = other - self;
        d.x.mul_add(d.x, d.y.mul_add(d.y, d.z * d.z))
    }

    /// Squared distance on the horizontal plane, ignoring height.
    pub fn horizontal_distance_squared(self, other: Self) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        dx.mul_add(dx, dz * dz)
    }

    /// Distance on the horizontal plane, ignoring height.
    pub fn horizontal_distance(self, other: Self) -> f32 {
        self.horizontal_distance_squared(other).sqrt()
    }

    /// Unit direction from `self` toward `target` on the horizontal plane.
    ///
    /// Returns `None` when the two points coincide horizontally.
    pub fn horizontal_direction_to(self, target: Self) -> Option<Self> {
        let dx = target.x - self.x;
        let dz = target.z - self.z;
        let len = dx.hypot(dz);
        if len <= f32::EPSILON {
            return None;
        }
        Some(Self::new(dx / len, 0.0, dz / len))
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_distance_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 100.0, 4.0);
        assert!((a.horizontal_distance(b) - 5.0).abs() < 1e-5);
        assert!((a.horizontal_distance_squared(b) - 25.0).abs() < 1e-4);
    }

    #[test]
    fn direction_is_normalized() {
        let dir = Vec3::ZERO.horizontal_direction_to(Vec3::new(10.0, 5.0, 0.0));
        let dir = dir.unwrap_or_default();
        assert!((dir.x - 1.0).abs() < 1e-5);
        assert!(dir.y.abs() < f32::EPSILON);
    }

    #[test]
    fn direction_to_self_is_none() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!(p.horizontal_direction_to(Vec3::new(1.0, 9.0, 3.0)).is_none());
    }
}
