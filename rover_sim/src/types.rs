// Core types shared across the simulation.
//
// Defines chunk coordinates, obstacle records and identifiers, the drive-mode
// and threat-phase enums, the cover target, and the angle helpers every
// heading computation goes through.
//
// Heading convention: yaw 0 faces +z; positive yaw turns toward +x, so the
// forward vector is `(sin yaw, cos yaw)` in the xz plane and local +x is the
// vehicle's left side. Steering angles share the sign: positive turns left.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// Integer coordinate of a square world chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk whose center is nearest to `(x, z)`: `round(position / size)`.
    pub fn containing(x: f32, z: f32, chunk_size: f32) -> Self {
        Self {
            x: (x / chunk_size).round() as i32,
            z: (z / chunk_size).round() as i32,
        }
    }

    /// Chebyshev (king-move) distance between two chunks.
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.z - other.z).unsigned_abs())
    }

    /// The 3×3 block of chunks centered on this one, row by row.
    pub fn neighborhood(self) -> impl Iterator<Item = ChunkCoord> {
        let Self { x, z } = self;
        (-1..=1).flat_map(move |dz| (-1..=1).map(move |dx| ChunkCoord::new(x + dx, z + dz)))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

// ---------------------------------------------------------------------------
// Obstacles
// ---------------------------------------------------------------------------

/// Identifies an obstacle by the chunk that generated it and its index within
/// that chunk's list. Stable across regenerations of the same chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId {
    pub chunk: ChunkCoord,
    pub index: u16,
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obstacle({}#{})", self.chunk, self.index)
    }
}

/// A rock on the terrain. `scale` is its physical size; `radius` is the
/// larger avoidance radius the steering search keeps clear of.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub x: f32,
    pub z: f32,
    pub radius: f32,
    pub scale: f32,
}

impl Obstacle {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }

    /// Small enough to drive over.
    pub fn is_runnable(&self, runnable_threshold: f32) -> bool {
        self.scale < runnable_threshold
    }

    /// Large enough to hide behind.
    pub fn is_giant(&self, giant_threshold: f32) -> bool {
        self.scale > giant_threshold
    }
}

// ---------------------------------------------------------------------------
// Behavior enums
// ---------------------------------------------------------------------------

/// The agent's behavioral state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveMode {
    /// A human is steering.
    Manual,
    /// Slow autonomous cruising.
    Wander,
    /// Fleeing toward a cover target.
    SeekCover,
    /// Commanded speed decays to zero.
    #[default]
    Stopped,
    /// Scripted reverse-and-turn out of a stuck position.
    Recovery,
}

impl DriveMode {
    /// Modes in which the steering cost search drives the vehicle.
    pub fn is_autonomous_drive(self) -> bool {
        matches!(self, DriveMode::Wander | DriveMode::SeekCover)
    }
}

/// Phase of the external threat (incoming meteor) signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatPhase {
    #[default]
    Idle,
    Incoming,
    Impact,
}

/// Where the agent is heading to hide. `obstacle_id` is `None` for a terrain
/// depression.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoverTarget {
    pub x: f32,
    pub z: f32,
    pub stop_distance: f32,
    pub obstacle_id: Option<ObstacleId>,
}

impl CoverTarget {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }
}

// ---------------------------------------------------------------------------
// Angles
// ---------------------------------------------------------------------------

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(mut angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    if angle.abs() > 4.0 * TAU {
        angle %= TAU;
    }
    while angle <= -PI {
        angle += TAU;
    }
    while angle > PI {
        angle -= TAU;
    }
    angle
}

/// Unit forward vector in the xz plane for a yaw.
pub fn heading_vector(yaw: f32) -> Vec2 {
    let (sin, cos) = yaw.sin_cos();
    Vec2::new(sin, cos)
}

/// Yaw that faces along `direction` (xz). Zero for a zero vector.
pub fn heading_of(direction: Vec2) -> f32 {
    if direction.length_squared() <= f32::EPSILON {
        return 0.0;
    }
    direction.x.atan2(direction.y)
}

/// Exponential smoothing factor for a rate (1/s) over `dt` seconds.
pub fn smoothing_alpha(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_rounding_is_centered() {
        let at = |x: f32, z: f32| ChunkCoord::containing(x, z, 80.0);
        assert_eq!(at(0.0, 0.0), ChunkCoord::new(0, 0));
        assert_eq!(at(39.9, -39.9), ChunkCoord::new(0, 0));
        assert_eq!(at(40.1, -40.1), ChunkCoord::new(1, -1));
        assert_eq!(at(-200.0, 130.0), ChunkCoord::new(-3, 2));
    }

    #[test]
    fn neighborhood_has_nine_distinct_chunks() {
        let center = ChunkCoord::new(-4, 7);
        let chunks: Vec<ChunkCoord> = center.neighborhood().collect();
        assert_eq!(chunks.len(), 9);
        for c in &chunks {
            assert!(c.chebyshev_distance(center) <= 1);
        }
        let mut sorted = chunks.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 9);
    }

    #[test]
    fn wrap_angle_range() {
        for i in -100..100 {
            let a = wrap_angle(i as f32 * 0.37);
            assert!(a > -PI - 1e-5 && a <= PI + 1e-5, "{a}");
        }
        assert_eq!(wrap_angle(0.0), 0.0);
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
    }

    #[test]
    fn heading_convention_round_trips() {
        let yaw = 0.8;
        let back = heading_of(heading_vector(yaw));
        assert!((back - yaw).abs() < 1e-5);
        // Positive yaw turns from +z toward +x.
        let quarter = heading_vector(PI / 2.0);
        assert!((quarter.x - 1.0).abs() < 1e-5 && quarter.y.abs() < 1e-5);
        assert_eq!(heading_of(Vec2::ZERO), 0.0);
    }

    #[test]
    fn giant_and_runnable_thresholds() {
        let rock = |scale| Obstacle {
            id: ObstacleId {
                chunk: ChunkCoord::new(0, 0),
                index: 0,
            },
            x: 0.0,
            z: 0.0,
            radius: scale,
            scale,
        };
        assert!(rock(2.0).is_runnable(2.5));
        assert!(!rock(2.5).is_runnable(2.5));
        assert!(rock(8.1).is_giant(8.0));
        assert!(!rock(8.0).is_giant(8.0));
    }
}
