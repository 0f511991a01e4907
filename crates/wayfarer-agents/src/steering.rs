//! Steering helpers shared by both state machines.
//!
//! Movement is expressed as a [`MoveIntent`]: walk forward along a heading,
//! optionally sprinting. Obstacle avoidance belongs to the host.

use rand::Rng;
use wayfarer_types::{MoveIntent, Vec3};

use wayfarer_core::WorldView;

/// Result of steering toward a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steer {
    /// Intent for this tick.
    pub intent: MoveIntent,
    /// Whether the point is within the stop distance.
    pub arrived: bool,
    /// Horizontal distance to the point.
    pub distance: f32,
}

/// Walk toward `to` until within `stop_distance`. Once arrived the intent
/// only faces the point.
pub fn approach(from: Vec3, to: Vec3, stop_distance: f32, sprint: bool) -> Steer {
    let distance = from.horizontal_distance(to);
    let heading = from.horizontal_direction_to(to);
    if distance <= stop_distance {
        return Steer {
            intent: MoveIntent::face(heading),
            arrived: true,
            distance,
        };
    }
    let intent = heading.map_or(MoveIntent::STILL, |h| MoveIntent::walk(h, sprint));
    Steer {
        intent,
        arrived: false,
        distance,
    }
}

/// A point drawn uniformly from the disc of `radius` around `center`, with
/// its height clamped to the terrain.
pub fn random_point_in_disc<W, R>(world: &W, rng: &mut R, center: Vec3, radius: f32) -> Vec3
where
    W: WorldView + ?Sized,
    R: Rng + ?Sized,
{
    let radius = radius.max(0.0);
    let r = radius * rng.random::<f32>().sqrt();
    let theta = rng.random_range(0.0..=std::f32::consts::TAU);
    let x = r.mul_add(theta.cos(), center.x);
    let z = r.mul_add(theta.sin(), center.z);
    Vec3::new(x, world.terrain_height(x, z), z)
}
