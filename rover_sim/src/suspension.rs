// Six-wheel suspension and locomotion.
//
// Each wheel is a one-dimensional spring-damper on the body's vertical axis.
// Per tick:
//   1. Transform the six mounts (`SuspensionParams::wheel_mounts`, body frame)
//      by the chassis pose into world hardpoints.
//   2. Sample the drivable surface under each hardpoint.
//   3. Move the body height toward `mean(ground) + ride_height` (snapped on
//      the first tick, exponentially smoothed after).
//   4. Each wheel's target offset is `ground + wheel_radius - body_height`;
//      the offset follows `a = -k (x - target) - c v` with semi-implicit
//      Euler, hard-clamped to `neutral ± max_travel` with velocity zeroed on
//      clamp. Neutral is `wheel_radius - ride_height`, the offset on flat
//      ground.
//   5. Steer the front and rear pairs (rear counter-steers), scale the inboard
//      and outboard wheel of the turn, and integrate spin from speed.
//   6. Slerp the body orientation toward `tilt(terrain normal) * yaw`.
//
// Wheel order is front-left, front-right, mid-left, mid-right, rear-left,
// rear-right: even indices are on the left (body +x) side.
//
// See also: `surface.rs` for the ground the wheels ride on, `sim.rs` for
// where the body height becomes the pose's y.

use crate::config::SuspensionParams;
use crate::surface::SurfaceQuery;
use crate::terrain::HeightField;
use crate::types::{heading_vector, smoothing_alpha};
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

pub const WHEEL_COUNT: usize = 6;

/// Floor for the wheel radius in the spin integration.
const MIN_WHEEL_RADIUS: f32 = 1e-3;

/// Which axle a wheel index sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axle {
    Front,
    Middle,
    Rear,
}

fn axle_of(wheel: usize) -> Axle {
    match wheel / 2 {
        0 => Axle::Front,
        1 => Axle::Middle,
        _ => Axle::Rear,
    }
}

fn is_left(wheel: usize) -> bool {
    wheel % 2 == 0
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelState {
    /// Vertical offset of the wheel center from the body origin.
    pub offset: f32,
    pub velocity: f32,
    pub steer_angle: f32,
    /// Rolling angle, kept in `[0, TAU)`.
    pub spin_angle: f32,
}

/// What the renderer needs for one wheel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelTransform {
    pub offset: f32,
    pub steer_angle: f32,
    pub spin_angle: f32,
}

/// The chassis motion the suspension follows this tick.
#[derive(Clone, Copy, Debug)]
pub struct Chassis {
    pub position: Vec2,
    pub yaw: f32,
    pub steer: f32,
    pub speed: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuspensionState {
    pub wheels: [WheelState; WHEEL_COUNT],
    pub body_height: f32,
    pub orientation: Quat,
    /// False until the first update; that update snaps body height and
    /// orientation instead of smoothing toward them.
    settled: bool,
}

impl SuspensionState {
    pub fn new(params: &SuspensionParams) -> Self {
        let neutral = neutral_offset(params);
        Self {
            wheels: [WheelState {
                offset: neutral,
                ..WheelState::default()
            }; WHEEL_COUNT],
            body_height: 0.0,
            orientation: Quat::IDENTITY,
            settled: false,
        }
    }

    /// World (x, z) of each wheel mount for a body at `position` facing `yaw`.
    pub fn hardpoints(params: &SuspensionParams, position: Vec2, yaw: f32) -> [Vec2; WHEEL_COUNT] {
        let forward = heading_vector(yaw);
        // Body +x in world: the forward vector rotated a quarter turn.
        let lateral = Vec2::new(forward.y, -forward.x);
        params
            .wheel_mounts
            .map(|[lat, long]| position + lateral * lat + forward * long)
    }

    /// Full per-tick suspension update.
    pub fn update(
        &mut self,
        params: &SuspensionParams,
        chassis: &Chassis,
        surface: &SurfaceQuery<'_>,
        terrain: &HeightField,
        dt: f32,
    ) {
        let grounds = Self::hardpoints(params, chassis.position, chassis.yaw)
            .map(|p| surface.height_at(p.x, p.y));

        self.settle_body(params, &grounds, dt);
        self.integrate_wheels(params, &grounds, dt);
        self.steer_and_spin(params, chassis.steer, chassis.speed, dt);

        let p = chassis.position;
        let (dx, dz) = terrain.gradient(p.x, p.y, params.gradient_epsilon);
        let target = terrain_orientation(dx, dz, chassis.yaw);
        let alpha = smoothing_alpha(params.orientation_rate, dt);
        self.orientation = if self.settled {
            self.orientation.slerp(target, alpha).normalize()
        } else {
            target
        };
        self.settled = true;
    }

    fn settle_body(&mut self, params: &SuspensionParams, grounds: &[f32; WHEEL_COUNT], dt: f32) {
        let mean = grounds.iter().sum::<f32>() / WHEEL_COUNT as f32;
        let target = mean + params.ride_height;
        if self.settled {
            let alpha = smoothing_alpha(params.body_height_rate, dt);
            self.body_height += (target - self.body_height) * alpha;
        } else {
            self.body_height = target;
        }
    }

    /// Spring-damper step of every wheel toward the given ground heights,
    /// relative to the current body height.
    pub fn integrate_wheels(
        &mut self,
        params: &SuspensionParams,
        grounds: &[f32; WHEEL_COUNT],
        dt: f32,
    ) {
        let neutral = neutral_offset(params);
        let lo = neutral - params.max_travel;
        let hi = neutral + params.max_travel;

        for (wheel, &ground) in self.wheels.iter_mut().zip(grounds) {
            let target = ground + params.wheel_radius - self.body_height;
            let spring = -params.stiffness * (wheel.offset - target);
            let accel = spring - params.damping * wheel.velocity;
            wheel.velocity += accel * dt;
            wheel.offset += wheel.velocity * dt;

            if wheel.offset < lo || wheel.offset > hi || !wheel.offset.is_finite() {
                wheel.offset = if wheel.offset.is_finite() {
                    wheel.offset.clamp(lo, hi)
                } else {
                    neutral
                };
                wheel.velocity = 0.0;
            }
        }
    }

    fn steer_and_spin(&mut self, params: &SuspensionParams, steer: f32, speed: f32, dt: f32) {
        let spin_rate = speed / params.wheel_radius.max(MIN_WHEEL_RADIUS);
        for (i, wheel) in self.wheels.iter_mut().enumerate() {
            let axle_factor = match axle_of(i) {
                Axle::Front => params.front_steer,
                Axle::Middle => 0.0,
                Axle::Rear => params.rear_steer,
            };
            // A positive steer turns left, so the left wheel is inboard.
            let inboard = (steer > 0.0) == is_left(i);
            let side_factor = if inboard {
                params.inner_steer
            } else {
                params.outer_steer
            };
            wheel.steer_angle = steer * axle_factor * side_factor;
            wheel.spin_angle = (wheel.spin_angle + spin_rate * dt).rem_euclid(TAU);
        }
    }

    pub fn transforms(&self) -> [WheelTransform; WHEEL_COUNT] {
        self.wheels.map(|w| WheelTransform {
            offset: w.offset,
            steer_angle: w.steer_angle,
            spin_angle: w.spin_angle,
        })
    }
}

/// Wheel offset on flat ground with the body at ride height.
pub fn neutral_offset(params: &SuspensionParams) -> f32 {
    params.wheel_radius - params.ride_height
}

/// Body orientation for a terrain slope `(dh/dx, dh/dz)` and heading `yaw`.
pub fn terrain_orientation(dx: f32, dz: f32, yaw: f32) -> Quat {
    let normal = Vec3::new(-dx, 1.0, -dz).normalize_or(Vec3::Y);
    Quat::from_rotation_arc(Vec3::Y, normal) * Quat::from_rotation_y(yaw)
}
