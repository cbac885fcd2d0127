// Top-level simulation state and the per-tick update sequence.
//
// `RoverSim` owns everything: the config, the PRNG, the height field, the
// obstacle cache, and the `AgentState`. The host calls `step` once per frame
// with the environment signal, the driver's input and the frame time, and
// reads back the pose, the wheel transforms and the narrative events.
//
// ## Update order
//
// `step` runs the same fixed sequence every tick:
//
//   1. Input toggles (panels, autopilot, view) and the panel animation, which
//      decides whether systems are offline this tick.
//   2. Obstacle cache refresh, if the rover crossed into a new chunk.
//   3. `NavState::plan`: mode evaluation, cover selection, throttled steering
//      search, stuck/recovery, and the resulting `DriveCommand`.
//   4. `Motion::integrate`: steer, speed, yaw and position.
//   5. `collision::resolve`: push-out, scrub, under-cover flag. A rover
//      wedged between rocks is put back where the tick started.
//   6. Measured speed from the post-collision displacement.
//   7. Surface query and `SuspensionState::update`; the body height becomes
//      the pose's y.
//
// `dt` is clamped to `[0, drive.max_dt]` before anything reads it.
//
// ## Hits
//
// `on_hit` is called by whatever simulates meteors. A hit taken under cover
// with the panels retracted past `hit_immunity_retraction` is absorbed;
// anything else adds one damage and knockback. Hit events are queued and
// delivered with the next `step`'s events.
//
// See also: `nav.rs`, `collision.rs`, `suspension.rs`, `panels.rs` for the
// stages, `obstacles.rs` for the cache.
//
// **Critical constraint: determinism.** Two sims built from the same config
// and fed the same `(signal, input, dt)` sequence and hits produce identical
// state.

use crate::collision;
use crate::command::{EnvironmentalSignal, ManualInput};
use crate::config::RoverConfig;
use crate::error::ConfigError;
use crate::event::{SimEvent, SimEventKind};
use crate::nav::{Motion, NavContext, NavInputs, NavState};
use crate::obstacles::{ChunkObstacleGenerator, ObstacleCache, ObstacleSource};
use crate::panels::PanelState;
use crate::prng::GameRng;
use crate::surface::SurfaceQuery;
use crate::suspension::{Chassis, SuspensionState, WHEEL_COUNT, WheelTransform};
use crate::terrain::HeightField;
use crate::types::{DriveMode, Obstacle, ThreatPhase};
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Everything that changes about the rover from tick to tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentState {
    pub motion: Motion,
    /// Post-collision displacement over the last tick, per second.
    pub measured_speed: f32,
    pub nav: NavState,
    pub suspension: SuspensionState,
    pub panels: PanelState,
    pub under_cover: bool,
    pub damage: u32,
}

impl AgentState {
    fn new(config: &RoverConfig) -> Self {
        let [x, z] = config.drive.spawn;
        Self {
            motion: Motion {
                position: Vec2::new(x, z),
                ..Motion::default()
            },
            measured_speed: 0.0,
            nav: NavState::new(config.drive.autopilot_on_spawn),
            suspension: SuspensionState::new(&config.suspension),
            panels: PanelState::default(),
            under_cover: false,
            damage: 0,
        }
    }

    /// World position; y is the suspended body height.
    pub fn position(&self) -> Vec3 {
        let p = self.motion.position;
        Vec3::new(p.x, self.suspension.body_height, p.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitOutcome {
    Absorbed,
    Taken { damage: u32 },
}

#[derive(Clone, Debug, Default)]
pub struct StepResult {
    pub events: Vec<SimEvent>,
}

pub struct RoverSim {
    /// Number of completed steps.
    pub tick: u64,
    pub config: RoverConfig,
    pub rng: GameRng,
    terrain: HeightField,
    obstacles: ObstacleCache,
    pub agent: AgentState,
    /// Hit events waiting for the next step.
    pending: Vec<SimEventKind>,
}

impl RoverSim {
    /// A sim over procedurally generated obstacles.
    pub fn new(config: RoverConfig) -> Result<Self, ConfigError> {
        let generator = ChunkObstacleGenerator::new(config.obstacles.clone());
        Self::with_source(config, ObstacleSource::Procedural(generator))
    }

    /// A sim over a fixed obstacle layout.
    pub fn with_obstacles(
        config: RoverConfig,
        obstacles: Vec<Obstacle>,
    ) -> Result<Self, ConfigError> {
        let source = ObstacleSource::Fixed {
            chunk_size: config.obstacles.chunk_size,
            obstacles,
        };
        Self::with_source(config, source)
    }

    fn with_source(config: RoverConfig, source: ObstacleSource) -> Result<Self, ConfigError> {
        config.validate()?;
        let terrain = HeightField::new(config.terrain.clone());
        let obstacles = ObstacleCache::new(source, config.obstacles.chunk_size);
        let mut sim = Self {
            tick: 0,
            rng: GameRng::new(config.rng_seed),
            agent: AgentState::new(&config),
            config,
            terrain,
            obstacles,
            pending: Vec::new(),
        };
        let spawn = sim.agent.motion.position;
        sim.obstacles.refresh(spawn.x, spawn.y);
        // Zero-length update: snaps body height and orientation to the ground.
        sim.update_suspension(0.0);
        tracing::info!(
            x = spawn.x,
            z = spawn.y,
            seed = sim.config.rng_seed,
            "rover spawned"
        );
        Ok(sim)
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self, signal: EnvironmentalSignal, input: ManualInput, dt: f32) -> StepResult {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.drive.max_dt)
        } else {
            0.0
        };
        let mut kinds = std::mem::take(&mut self.pending);

        // 1. Toggles and panels.
        if input.toggle_panels {
            self.agent.panels.toggle();
            kinds.push(SimEventKind::PanelsToggled {
                retract_requested: self.agent.panels.retract_requested,
            });
        }
        if input.toggle_autopilot {
            let enabled = self.agent.nav.toggle_autopilot();
            kinds.push(SimEventKind::AutopilotToggled { enabled });
        }
        if input.toggle_view {
            kinds.push(SimEventKind::ViewCycled);
        }
        let forced = signal.storm_active || signal.threat_phase == ThreatPhase::Impact;
        self.agent.panels.update(&self.config.panels, forced, dt);

        // 2. Chunk refresh.
        let before = self.agent.motion.position;
        if let Some(chunk) = self.obstacles.refresh(before.x, before.y) {
            kinds.push(SimEventKind::ChunkEntered { chunk });
        }

        // 3. Plan.
        let ctx = NavContext {
            config: &self.config,
            terrain: &self.terrain,
            obstacles: self.obstacles.obstacles(),
        };
        let inputs = NavInputs {
            signal,
            input,
            offline: self.agent.panels.offline,
            measured_speed: self.agent.measured_speed,
            dt,
        };
        let nav = &mut self.agent.nav;
        let motion = &self.agent.motion;
        let command = nav.plan(&ctx, motion, &inputs, &mut self.rng, &mut kinds);

        // 4. Integrate.
        let drive = &self.config.drive;
        self.agent.motion.integrate(&command, drive, dt);

        // 5. Collision.
        let obstacles = self.obstacles.obstacles();
        let motion = &mut self.agent.motion;
        let mut outcome = collision::resolve(
            &mut motion.position,
            &mut motion.speed,
            obstacles,
            &self.config,
        );
        if outcome.wedged {
            motion.position = before;
            outcome.under_cover = collision::under_cover(before, obstacles, &self.config);
            tracing::debug!(tick = self.tick, "wedged between rocks, motion reverted");
        }
        self.agent.under_cover = outcome.under_cover;

        // 6. Measured speed.
        self.agent.measured_speed = if dt > 0.0 {
            (self.agent.motion.position - before).length() / dt
        } else {
            0.0
        };

        // 7. Surface and suspension.
        self.update_suspension(dt);

        let tick = self.tick;
        self.tick += 1;
        let events = kinds
            .into_iter()
            .map(|kind| SimEvent { tick, kind })
            .collect();
        StepResult { events }
    }

    fn update_suspension(&mut self, dt: f32) {
        let obstacles = self.obstacles.obstacles();
        let surface = SurfaceQuery::new(&self.terrain, obstacles, &self.config.obstacles);
        let motion = &self.agent.motion;
        let chassis = Chassis {
            position: motion.position,
            yaw: motion.yaw,
            steer: motion.steer_angle,
            speed: motion.speed,
        };
        let params = &self.config.suspension;
        self.agent
            .suspension
            .update(params, &chassis, &surface, &self.terrain, dt);
    }

    /// A meteor hit the rover with `impact_velocity`.
    pub fn on_hit(&mut self, impact_velocity: Vec3) -> HitOutcome {
        let agent = &mut self.agent;
        if agent.under_cover && agent.panels.progress > self.config.panels.hit_immunity_retraction {
            tracing::info!(tick = self.tick, "hit absorbed under cover");
            self.pending.push(SimEventKind::HitAbsorbed);
            return HitOutcome::Absorbed;
        }

        agent.damage += 1;
        let push = Vec2::new(impact_velocity.x, impact_velocity.z);
        agent.motion.knockback += push * self.config.drive.knockback_scale;
        tracing::info!(
            tick = self.tick,
            damage = agent.damage,
            under_cover = agent.under_cover,
            "hit taken"
        );
        self.pending.push(SimEventKind::HitTaken {
            damage: agent.damage,
        });
        HitOutcome::Taken {
            damage: agent.damage,
        }
    }

    // -----------------------------------------------------------------------
    // Outputs
    // -----------------------------------------------------------------------

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.agent.position(),
            orientation: self.agent.suspension.orientation,
        }
    }

    pub fn wheel_transforms(&self) -> [WheelTransform; WHEEL_COUNT] {
        self.agent.suspension.transforms()
    }

    /// Drivable surface height (terrain plus runnable rocks in the loaded
    /// neighborhood) at `(x, z)`.
    pub fn surface_height(&self, x: f32, z: f32) -> f32 {
        let obstacles = self.obstacles.obstacles();
        let surface = SurfaceQuery::new(&self.terrain, obstacles, &self.config.obstacles);
        surface.height_at(x, z)
    }

    pub fn mode(&self) -> DriveMode {
        self.agent.nav.mode
    }

    pub fn terrain(&self) -> &HeightField {
        &self.terrain
    }

    /// The giant the rover is fleeing to, while it is still loaded.
    pub fn cover_obstacle(&self) -> Option<&Obstacle> {
        let id = self.agent.nav.cover?.obstacle_id?;
        self.obstacles.get(id)
    }

    /// Obstacles of the currently loaded 3×3 chunk neighborhood.
    pub fn obstacles(&self) -> &[Obstacle] {
        self.obstacles.obstacles()
    }
}
