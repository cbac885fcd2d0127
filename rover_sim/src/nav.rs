// Navigation agent: drive-mode state machine, speed/steer planning, and
// motion integration.
//
// Each tick `NavState::plan` turns the environment signal, the driver's
// input and the current motion into a `DriveCommand` (target speed and steer
// angle). `Motion::integrate` then moves the rover toward that command.
//
// Mode priority, evaluated every tick by `base_mode`:
//   1. MANUAL    : the driver is pressing a direction and systems are online.
//   2. STOPPED   : meteor impact, storm, or systems offline.
//   3. SEEK_COVER: a meteor is incoming.
//   4. WANDER    : autopilot is on.
//   5. STOPPED   : otherwise.
// RECOVERY is not a base mode. It replaces WANDER or SEEK_COVER while its
// timer runs and is cancelled the moment the base mode is anything else.
//
// Autonomous modes (WANDER, SEEK_COVER) steer with the cost search in
// `steering.rs`, re-run every `steering.interval_ticks` ticks (and
// immediately on entering a mode) with the result held in between. Speed is
// the mode's cruise speed, ramped down approaching cover, then cut on sharp
// turns and in two escalating heading-cost brackets.
//
// Cover is selected once per SEEK_COVER activation and kept until the threat
// returns to IDLE, so a recovery episode in the middle of a flight does not
// trigger a second search. Arrival has hysteresis: the agent stops inside the
// stop distance and only drives again beyond stop distance + arrival margin.
//
// Stuck detection runs only in autonomous modes: the stuck timer grows while
// the agent wants to move and is either blocked or barely moving, and decays
// otherwise. Past `stuck_duration` a recovery episode reverses with the wheels
// locked to a random side for `recovery.duration` seconds.
//
// See also: `steering.rs` for the search itself, `sim.rs` for the update
// order around `plan` and `integrate`.
//
// **Critical constraint: determinism.** The recovery side is the only random
// choice and it comes from the sim's `GameRng`.

use crate::command::{EnvironmentalSignal, ManualInput};
use crate::config::{DriveParams, RoverConfig};
use crate::event::SimEventKind;
use crate::prng::GameRng;
use crate::steering::{self, SteeringQuery};
use crate::terrain::HeightField;
use crate::types::{
    CoverTarget, DriveMode, Obstacle, ThreatPhase, heading_of, heading_vector, smoothing_alpha,
    wrap_angle,
};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Horizontal kinematic state of the rover.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub position: Vec2,
    pub yaw: f32,
    pub steer_angle: f32,
    /// Signed forward speed; negative while reversing.
    pub speed: f32,
    /// Decaying velocity from meteor hits, added on top of driving.
    pub knockback: Vec2,
}

impl Motion {
    /// Advance speed, steer, yaw and position toward `command` over `dt`.
    pub fn integrate(&mut self, command: &DriveCommand, drive: &DriveParams, dt: f32) {
        let max_steer = drive.max_steer;
        let target_steer = command.target_steer.clamp(-max_steer, max_steer);
        let alpha = smoothing_alpha(drive.steer_rate, dt);
        self.steer_angle += (target_steer - self.steer_angle) * alpha;
        self.steer_angle = self.steer_angle.clamp(-max_steer, max_steer);

        let target = command.target_speed;
        // Speeding up in the current direction accelerates; anything else brakes.
        let accelerating = target.abs() > self.speed.abs() && target * self.speed >= 0.0;
        let rate = if accelerating {
            drive.accel_rate
        } else {
            drive.brake_rate
        };
        self.speed += (target - self.speed) * smoothing_alpha(rate, dt);
        if target == 0.0 && self.speed.abs() < drive.speed_epsilon {
            self.speed = 0.0;
        }

        let yaw_rate = self.speed / drive.wheelbase * self.steer_angle.tan();
        self.yaw = wrap_angle(self.yaw + yaw_rate * dt);
        self.position += heading_vector(self.yaw) * (self.speed * dt) + self.knockback * dt;
        self.knockback *= (-drive.knockback_decay * dt).exp();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveCommand {
    pub target_speed: f32,
    pub target_steer: f32,
}

/// World data the planner reads.
pub struct NavContext<'a> {
    pub config: &'a RoverConfig,
    pub terrain: &'a HeightField,
    pub obstacles: &'a [Obstacle],
}

/// Per-tick inputs to the planner.
#[derive(Clone, Copy, Debug)]
pub struct NavInputs {
    pub signal: EnvironmentalSignal,
    pub input: ManualInput,
    /// Panels are mid-animation; the rover must not drive.
    pub offline: bool,
    /// Speed actually achieved last tick, after collision.
    pub measured_speed: f32,
    pub dt: f32,
}

/// The mode the rover would be in this tick, before recovery is considered.
pub fn base_mode(
    signal: &EnvironmentalSignal,
    input: &ManualInput,
    offline: bool,
    autopilot: bool,
) -> DriveMode {
    if input.is_active() && !offline {
        DriveMode::Manual
    } else if signal.threat_phase == ThreatPhase::Impact || signal.storm_active || offline {
        DriveMode::Stopped
    } else if signal.threat_phase == ThreatPhase::Incoming {
        DriveMode::SeekCover
    } else if autopilot {
        DriveMode::Wander
    } else {
        DriveMode::Stopped
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavState {
    pub mode: DriveMode,
    pub autopilot: bool,
    pub cover: Option<CoverTarget>,
    /// Cover selection already ran for the current threat.
    pub cover_searched: bool,
    pub cover_arrived: bool,
    pub stuck_timer: f32,
    pub recovery_timer: f32,
    pub recovery_steer: f32,
    pub scan_timer: f32,
    pub scanning: bool,
    /// Held result of the last steering search.
    pub steer_target: f32,
    pub heading_cost: f32,
    pub blocked: bool,
    /// Ticks since the last steering search.
    decision_age: u32,
}

impl NavState {
    pub fn new(autopilot: bool) -> Self {
        Self {
            mode: DriveMode::Stopped,
            autopilot,
            cover: None,
            cover_searched: false,
            cover_arrived: false,
            stuck_timer: 0.0,
            recovery_timer: 0.0,
            recovery_steer: 0.0,
            scan_timer: 0.0,
            scanning: false,
            steer_target: 0.0,
            heading_cost: 0.0,
            blocked: false,
            decision_age: u32::MAX,
        }
    }

    pub fn toggle_autopilot(&mut self) -> bool {
        self.autopilot = !self.autopilot;
        self.autopilot
    }

    pub fn plan(
        &mut self,
        ctx: &NavContext<'_>,
        motion: &Motion,
        inputs: &NavInputs,
        rng: &mut GameRng,
        events: &mut Vec<SimEventKind>,
    ) -> DriveCommand {
        let config = ctx.config;
        let signal = &inputs.signal;

        if signal.threat_phase == ThreatPhase::Idle && self.cover_searched {
            self.cover = None;
            self.cover_searched = false;
            self.cover_arrived = false;
        }

        let base = base_mode(signal, &inputs.input, inputs.offline, self.autopilot);
        let mut next = base;
        if self.mode == DriveMode::Recovery {
            if base.is_autonomous_drive() && self.recovery_timer > 0.0 {
                next = DriveMode::Recovery;
            } else {
                self.recovery_timer = 0.0;
                events.push(SimEventKind::RecoveryEnded);
                tracing::info!(resume = ?base, "recovery ended");
            }
        }
        self.set_mode(next, events);

        if self.mode == DriveMode::SeekCover && !self.cover_searched {
            self.acquire_cover(ctx, motion.position, events);
        }

        self.update_scan(config, signal, inputs.dt);

        match self.mode {
            DriveMode::Manual => {
                self.decay_stuck(config, inputs.dt);
                DriveCommand {
                    target_speed: f32::from(inputs.input.throttle) * config.drive.manual_speed,
                    target_steer: f32::from(inputs.input.steer) * config.drive.max_steer,
                }
            }
            DriveMode::Stopped => {
                self.decay_stuck(config, inputs.dt);
                DriveCommand::default()
            }
            DriveMode::Recovery => self.recovery_command(config, inputs.dt),
            DriveMode::Wander | DriveMode::SeekCover => {
                self.autonomous_command(ctx, motion, inputs, rng, events)
            }
        }
    }

    fn set_mode(&mut self, next: DriveMode, events: &mut Vec<SimEventKind>) {
        if next == self.mode {
            return;
        }
        tracing::info!(from = ?self.mode, to = ?next, "drive mode changed");
        events.push(SimEventKind::ModeChanged {
            from: self.mode,
            to: next,
        });
        self.mode = next;
        // Fresh search on the first autonomous tick of the new mode.
        self.decision_age = u32::MAX;
    }

    fn acquire_cover(
        &mut self,
        ctx: &NavContext<'_>,
        position: Vec2,
        events: &mut Vec<SimEventKind>,
    ) {
        self.cover_searched = true;
        self.cover_arrived = false;
        self.cover = steering::select_cover(position, ctx.obstacles, ctx.terrain, ctx.config);
        match self.cover {
            Some(target) => {
                tracing::debug!(
                    x = target.x,
                    z = target.z,
                    stop_distance = target.stop_distance,
                    obstacle = ?target.obstacle_id,
                    "cover acquired"
                );
                events.push(SimEventKind::CoverAcquired { target });
            }
            None => {
                tracing::warn!(x = position.x, z = position.y, "no cover within reach");
                events.push(SimEventKind::CoverUnavailable);
            }
        }
    }

    fn update_scan(&mut self, config: &RoverConfig, signal: &EnvironmentalSignal, dt: f32) {
        let idle = signal.threat_phase == ThreatPhase::Idle
            && !signal.storm_active
            && matches!(self.mode, DriveMode::Wander | DriveMode::Stopped);
        if idle {
            let scan = &config.scan;
            self.scan_timer = (self.scan_timer + dt).rem_euclid(scan.period);
            self.scanning = self.scan_timer >= scan.period - scan.active;
        } else {
            self.scan_timer = 0.0;
            self.scanning = false;
        }
    }

    fn decay_stuck(&mut self, config: &RoverConfig, dt: f32) {
        self.stuck_timer = (self.stuck_timer - config.recovery.stuck_decay * dt).max(0.0);
    }

    fn recovery_command(&mut self, config: &RoverConfig, dt: f32) -> DriveCommand {
        self.recovery_timer -= dt;
        DriveCommand {
            target_speed: -config.drive.recovery_speed,
            target_steer: self.recovery_steer,
        }
    }

    fn autonomous_command(
        &mut self,
        ctx: &NavContext<'_>,
        motion: &Motion,
        inputs: &NavInputs,
        rng: &mut GameRng,
        events: &mut Vec<SimEventKind>,
    ) -> DriveCommand {
        let config = ctx.config;
        let seeking = self.mode == DriveMode::SeekCover;
        let cover = if seeking { self.cover } else { None };

        self.decision_age = self.decision_age.saturating_add(1);
        if self.decision_age >= config.steering.interval_ticks {
            self.decision_age = 0;
            let desired_offset = cover.map_or(0.0, |c| {
                wrap_angle(heading_of(c.position() - motion.position) - motion.yaw)
            });
            let query = SteeringQuery {
                position: motion.position,
                yaw: motion.yaw,
                steer: motion.steer_angle,
                speed: motion.speed,
                desired_offset,
                exclude: cover.and_then(|c| c.obstacle_id),
            };
            let decision = steering::search(&query, ctx.obstacles, ctx.terrain, config);
            self.steer_target = decision.steer_target;
            let best = decision.candidates.get(decision.best);
            self.heading_cost = best.map_or(0.0, |c| c.cost);
            self.blocked = decision.blocked;
        }

        let mut speed = if seeking {
            self.cover_speed(config, motion.position, events)
        } else {
            config.drive.wander_speed
        };

        let drive = &config.drive;
        if self.steer_target.abs() > drive.sharp_turn_threshold {
            speed *= drive.sharp_turn_factor;
        }
        if self.heading_cost > drive.cost_high {
            speed *= drive.cost_high_factor;
        } else if self.heading_cost > drive.cost_mid {
            speed *= drive.cost_mid_factor;
        }

        let recovery = &config.recovery;
        let wants_to_move = speed > 0.0;
        if wants_to_move && (self.blocked || inputs.measured_speed.abs() < recovery.stuck_speed) {
            self.stuck_timer += inputs.dt;
        } else {
            self.decay_stuck(config, inputs.dt);
        }

        if self.stuck_timer > recovery.stuck_duration {
            self.start_recovery(config, rng, events);
            return self.recovery_command(config, inputs.dt);
        }

        DriveCommand {
            target_speed: speed,
            target_steer: self.steer_target,
        }
    }

    /// Cruise speed toward the cover target, with the approach ramp and
    /// arrival hysteresis.
    fn cover_speed(
        &mut self,
        config: &RoverConfig,
        position: Vec2,
        events: &mut Vec<SimEventKind>,
    ) -> f32 {
        let cover_params = &config.cover;
        let Some(cover) = self.cover else {
            return config.drive.cover_speed;
        };
        let dist = cover.position().distance(position);

        if self.cover_arrived {
            if dist > cover.stop_distance + cover_params.arrival_margin {
                self.cover_arrived = false;
            }
        } else if dist <= cover.stop_distance {
            self.cover_arrived = true;
            tracing::info!(distance = dist, "reached cover");
            events.push(SimEventKind::CoverReached);
        }
        if self.cover_arrived {
            return 0.0;
        }

        let ramp = (dist - cover.stop_distance) / cover_params.slow_radius.max(f32::EPSILON);
        config.drive.cover_speed * ramp.clamp(cover_params.min_approach_factor, 1.0)
    }

    fn start_recovery(
        &mut self,
        config: &RoverConfig,
        rng: &mut GameRng,
        events: &mut Vec<SimEventKind>,
    ) {
        let magnitude = config.drive.max_steer * config.recovery.steer_fraction;
        self.recovery_steer = rng.next_sign() * magnitude;
        self.recovery_timer = config.recovery.duration;
        self.stuck_timer = 0.0;
        tracing::info!(
            steer = self.recovery_steer,
            blocked = self.blocked,
            "stuck; starting recovery"
        );
        events.push(SimEventKind::RecoveryStarted {
            steer: self.recovery_steer,
        });
        self.set_mode(DriveMode::Recovery, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainParams;
    use crate::types::{ChunkCoord, ObstacleId};

    const DT: f32 = 1.0 / 60.0;

    fn flat() -> HeightField {
        HeightField::new(TerrainParams {
            height_scale: 0.0,
            tilt_amplitude: 0.0,
            roughness_amplitude: 0.0,
            ..TerrainParams::default()
        })
    }

    fn rock(index: u16, x: f32, z: f32, scale: f32) -> Obstacle {
        Obstacle {
            id: ObstacleId {
                chunk: ChunkCoord::new(0, 0),
                index,
            },
            x,
            z,
            radius: scale * 1.15,
            scale,
        }
    }

    fn inputs(signal: EnvironmentalSignal, measured_speed: f32) -> NavInputs {
        NavInputs {
            signal,
            input: ManualInput::default(),
            offline: false,
            measured_speed,
            dt: DT,
        }
    }

    #[test]
    fn mode_priority() {
        let idle = EnvironmentalSignal::default();
        let storm = EnvironmentalSignal::storm();
        let incoming = EnvironmentalSignal::threat(ThreatPhase::Incoming);
        let impact = EnvironmentalSignal::threat(ThreatPhase::Impact);
        let forward = ManualInput::drive(1, 0);
        let none = ManualInput::default();

        assert_eq!(base_mode(&storm, &forward, false, true), DriveMode::Manual);
        assert_eq!(base_mode(&idle, &forward, true, true), DriveMode::Stopped);
        assert_eq!(base_mode(&impact, &none, false, true), DriveMode::Stopped);
        assert_eq!(base_mode(&storm, &none, false, true), DriveMode::Stopped);
        assert_eq!(base_mode(&incoming, &none, true, true), DriveMode::Stopped);
        assert_eq!(
            base_mode(&incoming, &none, false, false),
            DriveMode::SeekCover
        );
        assert_eq!(base_mode(&idle, &none, false, true), DriveMode::Wander);
        assert_eq!(base_mode(&idle, &none, false, false), DriveMode::Stopped);
    }

    #[test]
    fn straight_line_keeps_yaw() {
        let drive = DriveParams::default();
        let mut motion = Motion::default();
        let command = DriveCommand {
            target_speed: 12.0,
            target_steer: 0.0,
        };
        for _ in 0..600 {
            motion.integrate(&command, &drive, DT);
        }
        assert_eq!(motion.yaw, 0.0);
        assert_eq!(motion.position.x, 0.0);
        assert!((motion.speed - 12.0).abs() < 1e-3);
        assert!(motion.position.y > 100.0);
    }

    #[test]
    fn positive_steer_turns_left_toward_positive_x() {
        let drive = DriveParams::default();
        let mut motion = Motion {
            speed: 5.0,
            ..Motion::default()
        };
        let command = DriveCommand {
            target_speed: 5.0,
            target_steer: 0.4,
        };
        for _ in 0..30 {
            motion.integrate(&command, &drive, DT);
        }
        assert!(motion.yaw > 0.0);
        assert!(motion.position.x > 0.0);
        assert!(motion.steer_angle > 0.0 && motion.steer_angle <= drive.max_steer);
    }

    #[test]
    fn braking_snaps_to_zero() {
        let drive = DriveParams::default();
        let mut motion = Motion {
            speed: 8.0,
            ..Motion::default()
        };
        for _ in 0..300 {
            motion.integrate(&DriveCommand::default(), &drive, DT);
        }
        assert_eq!(motion.speed, 0.0);
        let parked = motion.position;
        motion.integrate(&DriveCommand::default(), &drive, DT);
        assert_eq!(motion.position, parked);
    }

    #[test]
    fn braking_is_faster_than_accelerating() {
        let drive = DriveParams::default();
        let mut up = Motion::default();
        up.integrate(
            &DriveCommand {
                target_speed: 10.0,
                target_steer: 0.0,
            },
            &drive,
            DT,
        );
        let mut down = Motion {
            speed: 10.0,
            ..Motion::default()
        };
        down.integrate(&DriveCommand::default(), &drive, DT);
        assert!(10.0 - down.speed > up.speed);
    }

    #[test]
    fn knockback_moves_and_decays() {
        let drive = DriveParams::default();
        let mut motion = Motion {
            knockback: Vec2::new(4.0, 0.0),
            ..Motion::default()
        };
        motion.integrate(&DriveCommand::default(), &drive, DT);
        assert!(motion.position.x > 0.0);
        assert!(motion.knockback.x < 4.0);
        for _ in 0..600 {
            motion.integrate(&DriveCommand::default(), &drive, DT);
        }
        assert!(motion.knockback.length() < 1e-3);
    }

    #[test]
    fn wander_drives_forward() {
        let config = RoverConfig::default();
        let terrain = flat();
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &[],
        };
        let mut nav = NavState::new(true);
        let mut rng = GameRng::new(1);
        let mut events = Vec::new();
        let command = nav.plan(
            &ctx,
            &Motion::default(),
            &inputs(EnvironmentalSignal::default(), 0.0),
            &mut rng,
            &mut events,
        );
        assert_eq!(nav.mode, DriveMode::Wander);
        assert_eq!(command.target_speed, config.drive.wander_speed);
        assert!(command.target_steer.abs() < 1e-6);
        assert_eq!(
            events,
            vec![SimEventKind::ModeChanged {
                from: DriveMode::Stopped,
                to: DriveMode::Wander,
            }]
        );
    }

    #[test]
    fn search_is_throttled() {
        let config = RoverConfig::default();
        let terrain = flat();
        let rocks = [rock(0, 0.0, 9.0, 4.0)];
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &rocks,
        };
        let mut nav = NavState::new(true);
        let mut rng = GameRng::new(1);
        let mut events = Vec::new();
        let signal = inputs(EnvironmentalSignal::default(), 5.0);

        nav.plan(&ctx, &Motion::default(), &signal, &mut rng, &mut events);
        let first = nav.steer_target;
        assert!(first.abs() > 0.1);

        // Between searches the held target survives even if the world changes.
        let empty = NavContext {
            obstacles: &[],
            ..ctx
        };
        for _ in 1..config.steering.interval_ticks {
            nav.plan(&empty, &Motion::default(), &signal, &mut rng, &mut events);
            assert_eq!(nav.steer_target, first);
        }
        nav.plan(&empty, &Motion::default(), &signal, &mut rng, &mut events);
        assert!(nav.steer_target.abs() < 1e-6);
    }

    #[test]
    fn cover_is_selected_once_until_idle() {
        let config = RoverConfig::default();
        let terrain = flat();
        let rocks = [rock(0, 30.0, 0.0, 20.0)];
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &rocks,
        };
        let mut nav = NavState::new(true);
        let mut rng = GameRng::new(1);
        let mut events = Vec::new();
        let incoming = inputs(EnvironmentalSignal::threat(ThreatPhase::Incoming), 5.0);

        nav.plan(&ctx, &Motion::default(), &incoming, &mut rng, &mut events);
        assert_eq!(nav.mode, DriveMode::SeekCover);
        let cover = nav.cover.unwrap();
        assert_eq!(cover.obstacle_id, Some(rocks[0].id));

        // A different world doesn't trigger a new search while the threat lasts.
        let elsewhere = NavContext {
            obstacles: &[],
            ..ctx
        };
        nav.plan(
            &elsewhere,
            &Motion::default(),
            &incoming,
            &mut rng,
            &mut events,
        );
        assert_eq!(nav.cover, Some(cover));
        let acquired = events
            .iter()
            .filter(|e| matches!(e, SimEventKind::CoverAcquired { .. }))
            .count();
        assert_eq!(acquired, 1);

        nav.plan(
            &elsewhere,
            &Motion::default(),
            &inputs(EnvironmentalSignal::default(), 5.0),
            &mut rng,
            &mut events,
        );
        assert_eq!(nav.cover, None);
        assert_eq!(nav.mode, DriveMode::Wander);
    }

    #[test]
    fn cover_arrival_has_hysteresis() {
        let config = RoverConfig::default();
        let terrain = flat();
        let rocks = [rock(0, 30.0, 0.0, 20.0)];
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &rocks,
        };
        let mut nav = NavState::new(true);
        let mut rng = GameRng::new(1);
        let mut events = Vec::new();
        let incoming = inputs(EnvironmentalSignal::threat(ThreatPhase::Incoming), 5.0);
        let facing_rock = |x: f32| Motion {
            position: Vec2::new(x, 0.0),
            yaw: std::f32::consts::FRAC_PI_2,
            ..Motion::default()
        };

        let stop = 23.0 * 0.88;
        let inside = facing_rock(30.0 - stop + 0.1);
        let command = nav.plan(&ctx, &inside, &incoming, &mut rng, &mut events);
        assert_eq!(command.target_speed, 0.0);
        assert!(nav.cover_arrived);
        assert!(events.contains(&SimEventKind::CoverReached));

        // Inside the margin: stay put.
        let nudged = facing_rock(30.0 - stop - 1.0);
        let command = nav.plan(&ctx, &nudged, &incoming, &mut rng, &mut events);
        assert_eq!(command.target_speed, 0.0);

        // Pushed out past the margin: drive again.
        let pushed = facing_rock(30.0 - stop - 2.0);
        let command = nav.plan(&ctx, &pushed, &incoming, &mut rng, &mut events);
        assert!(command.target_speed > 0.0);
        assert!(!nav.cover_arrived);
    }

    #[test]
    fn stuck_agent_recovers_and_resumes() {
        let config = RoverConfig::default();
        let terrain = flat();
        let ring: Vec<Obstacle> = (0..24)
            .map(|i| {
                let a = i as f32 / 24.0 * std::f32::consts::TAU;
                rock(i, 7.0 * a.sin(), 7.0 * a.cos(), 3.0)
            })
            .collect();
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &ring,
        };
        let mut nav = NavState::new(true);
        let mut rng = GameRng::new(9);
        let mut events = Vec::new();
        let signal = inputs(EnvironmentalSignal::default(), 0.0);

        let mut started_at = None;
        for tick in 0..200 {
            let command = nav.plan(&ctx, &Motion::default(), &signal, &mut rng, &mut events);
            if nav.mode == DriveMode::Recovery {
                assert!(command.target_speed < 0.0);
                assert!((command.target_steer.abs() - config.drive.max_steer).abs() < 1e-6);
                started_at = Some(tick);
                break;
            }
        }
        let started_at = started_at.expect("never entered recovery");
        // 1.5 s of stuck time at 60 Hz.
        assert!(
            (88..=92).contains(&started_at),
            "recovery at tick {started_at}"
        );
        assert_eq!(nav.stuck_timer, 0.0);

        let mut ended_after = None;
        for tick in 1..200 {
            nav.plan(&ctx, &Motion::default(), &signal, &mut rng, &mut events);
            if nav.mode != DriveMode::Recovery {
                ended_after = Some(tick);
                break;
            }
        }
        let ended_after = ended_after.expect("recovery never ended");
        assert!(
            (88..=92).contains(&ended_after),
            "recovery lasted {ended_after} ticks"
        );
        assert_eq!(nav.mode, DriveMode::Wander);
        assert!(events.contains(&SimEventKind::RecoveryEnded));
    }

    #[test]
    fn storm_cancels_recovery() {
        let config = RoverConfig::default();
        let terrain = flat();
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &[],
        };
        let mut nav = NavState::new(true);
        nav.mode = DriveMode::Recovery;
        nav.recovery_timer = 1.0;
        let mut rng = GameRng::new(1);
        let mut events = Vec::new();
        let command = nav.plan(
            &ctx,
            &Motion::default(),
            &inputs(EnvironmentalSignal::storm(), 0.0),
            &mut rng,
            &mut events,
        );
        assert_eq!(nav.mode, DriveMode::Stopped);
        assert_eq!(nav.recovery_timer, 0.0);
        assert_eq!(command, DriveCommand::default());
        assert_eq!(events[0], SimEventKind::RecoveryEnded);
    }

    #[test]
    fn manual_input_drives_directly() {
        let config = RoverConfig::default();
        let terrain = flat();
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &[],
        };
        let mut nav = NavState::new(false);
        let mut rng = GameRng::new(1);
        let mut events = Vec::new();
        let manual = NavInputs {
            input: ManualInput::drive(-1, 1),
            ..inputs(EnvironmentalSignal::default(), 0.0)
        };
        // Manual control never counts as stuck.
        for _ in 0..300 {
            let command = nav.plan(&ctx, &Motion::default(), &manual, &mut rng, &mut events);
            assert_eq!(command.target_speed, -config.drive.manual_speed);
            assert_eq!(command.target_steer, config.drive.max_steer);
        }
        assert_eq!(nav.mode, DriveMode::Manual);
        assert_eq!(nav.stuck_timer, 0.0);
    }

    #[test]
    fn sharp_turns_slow_the_rover() {
        let config = RoverConfig::default();
        let terrain = flat();
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &[],
        };
        let mut nav = NavState::new(true);
        let mut rng = GameRng::new(1);
        let mut events = Vec::new();
        // Cover behind-left: the search picks the hardest left turn.
        let rocks = [rock(0, 40.0, -10.0, 20.0)];
        let seek = NavContext {
            obstacles: &rocks,
            ..ctx
        };
        let command = nav.plan(
            &seek,
            &Motion::default(),
            &inputs(EnvironmentalSignal::threat(ThreatPhase::Incoming), 5.0),
            &mut rng,
            &mut events,
        );
        assert!((nav.steer_target - config.drive.max_steer).abs() < 1e-6);
        assert!(command.target_speed < config.drive.cover_speed);
        let expected = config.drive.cover_speed * config.drive.sharp_turn_factor;
        assert!((command.target_speed - expected).abs() < 1e-4);
    }

    #[test]
    fn scan_cycles_only_when_idle() {
        let config = RoverConfig::default();
        let terrain = flat();
        let ctx = NavContext {
            config: &config,
            terrain: &terrain,
            obstacles: &[],
        };
        let mut nav = NavState::new(false);
        let mut rng = GameRng::new(1);
        let mut events = Vec::new();
        let idle = inputs(EnvironmentalSignal::default(), 0.0);

        let mut scanning_ticks = 0;
        let ticks = (config.scan.period / DT).round() as usize;
        for _ in 0..ticks {
            nav.plan(&ctx, &Motion::default(), &idle, &mut rng, &mut events);
            if nav.scanning {
                scanning_ticks += 1;
            }
        }
        let expected = (config.scan.active / DT).round() as i32;
        assert!(
            (scanning_ticks - expected).abs() <= 2,
            "{scanning_ticks} scanning ticks"
        );

        let storm = inputs(EnvironmentalSignal::storm(), 0.0);
        nav.plan(&ctx, &Motion::default(), &storm, &mut rng, &mut events);
        assert!(!nav.scanning);
        assert_eq!(nav.scan_timer, 0.0);
    }
}
