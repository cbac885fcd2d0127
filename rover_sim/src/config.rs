// Data-driven rover configuration.
//
// Every tunable constant of the simulation lives in `RoverConfig`, grouped by
// the subsystem that reads it. The sim never hard-codes a magic number that
// affects behavior; it reads from the config. Configs are loaded from JSON;
// each group is `#[serde(default)]`, so a document only needs to name the
// values it overrides (`"{}"` is the default config).
//
// Groups:
// - `TerrainParams`:    height-field frequencies, warp strength, octave weights.
// - `ObstacleParams`:   chunk size, tier table, giant/runnable thresholds, corridor.
// - `DriveParams`:      speeds, smoothing rates, steering geometry, speed brackets.
// - `SteeringParams`:   candidate count, field of view, cost weights, lookahead.
// - `CoverParams`:      cover search radius, stop distance, depression fallback.
// - `RecoveryParams`:   stuck detection and reverse-recovery timing.
// - `ScanParams`:       idle sensor sweep period.
// - `PanelParams`:      panel retraction rate and the offline hysteresis band.
// - `CollisionParams`:  agent radius, contact/cover factors, scrub friction.
// - `SuspensionParams`: wheel mounts, spring constants, travel, steering split.
//
// See also: `sim.rs` which owns the `RoverConfig`, `error.rs` for
// `ConfigError`.
//
// **Critical constraint: determinism.** Config values feed directly into the
// simulation. Two runs only agree if their configs are identical.

use crate::error::ConfigError;
use crate::suspension::WHEEL_COUNT;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Height-field constants. The pipeline is fixed (warp → warp → sample →
/// detail → remap → tilt → roughness); these values tune it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Seed offset mixed into every lattice hash.
    pub seed: f32,
    /// World-to-noise scale of the base layer.
    pub base_frequency: f32,
    /// How far (in noise units) each warp layer displaces the next sample.
    pub warp_strength: f32,
    /// Weights of the warped base layer and the 2× and 4× detail octaves.
    pub octave_weights: [f32; 3],
    /// Subtracted from the weighted noise sum before scaling.
    pub bias: f32,
    /// Multiplier turning the centered noise sum into world units.
    pub height_scale: f32,
    /// Amplitude of the `sin(x) * cos(z)` global tilt.
    pub tilt_amplitude: f32,
    /// Frequencies of the global tilt along x and z.
    pub tilt_frequency: [f32; 2],
    /// Frequency of the surface roughness layer.
    pub roughness_frequency: f32,
    /// Peak-to-peak amplitude of the surface roughness layer.
    pub roughness_amplitude: f32,
    /// Frequency of the cheap single-octave texture variant.
    pub texture_frequency: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 7.31,
            base_frequency: 0.003,
            warp_strength: 1.5,
            octave_weights: [0.6, 0.28, 0.12],
            bias: 0.5,
            height_scale: 24.0,
            tilt_amplitude: 4.0,
            tilt_frequency: [0.0021, 0.0017],
            roughness_frequency: 0.35,
            roughness_amplitude: 0.3,
            texture_frequency: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// Obstacles
// ---------------------------------------------------------------------------

/// One size class of generated obstacles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleTier {
    /// Number of obstacles of this tier per chunk.
    pub count: u32,
    pub min_scale: f32,
    pub max_scale: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleParams {
    /// Global seed added to every chunk seed.
    pub world_seed: f64,
    /// Side length of a chunk in world units.
    pub chunk_size: f32,
    /// Tiers generated in order: giant, massive, large.
    pub tiers: Vec<ObstacleTier>,
    /// Avoidance radius = `scale * radius_factor`.
    pub radius_factor: f32,
    /// Obstacles strictly larger than this are giants: they give cover and
    /// are kept out of the central corridor.
    pub giant_threshold: f32,
    /// Obstacles smaller than this are runnable: driven over, never collided with.
    pub runnable_threshold: f32,
    /// Half-width of the central corridor (|x| below this) kept free of giants.
    pub corridor_half_width: f32,
    /// A runnable rock raises the surface within `ramp_reach * scale` of its center.
    pub ramp_reach: f32,
    /// The rock hemisphere's center sits `ramp_sink * scale` below the terrain.
    pub ramp_sink: f32,
}

impl Default for ObstacleParams {
    fn default() -> Self {
        Self {
            world_seed: 0.0,
            chunk_size: 80.0,
            tiers: vec![
                ObstacleTier {
                    count: 1,
                    min_scale: 14.0,
                    max_scale: 22.0,
                },
                ObstacleTier {
                    count: 3,
                    min_scale: 8.5,
                    max_scale: 13.0,
                },
                ObstacleTier {
                    count: 25,
                    min_scale: 0.8,
                    max_scale: 5.0,
                },
            ],
            radius_factor: 1.15,
            giant_threshold: 8.0,
            runnable_threshold: 2.5,
            corridor_half_width: 25.0,
            ramp_reach: 0.9,
            ramp_sink: 0.4,
        }
    }
}

// ---------------------------------------------------------------------------
// Driving
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveParams {
    /// Spawn position (x, z).
    pub spawn: [f32; 2],
    /// Whether autopilot starts enabled.
    pub autopilot_on_spawn: bool,
    /// Speed at full manual throttle.
    pub manual_speed: f32,
    /// Cruising speed while wandering.
    pub wander_speed: f32,
    /// Top speed while fleeing to cover.
    pub cover_speed: f32,
    /// Reverse speed during stuck recovery (positive; applied backwards).
    pub recovery_speed: f32,
    /// Exponential rate toward a faster target speed (1/s).
    pub accel_rate: f32,
    /// Exponential rate toward a slower target speed (1/s).
    pub brake_rate: f32,
    /// Exponential rate of the steer angle toward its target (1/s).
    pub steer_rate: f32,
    /// Maximum steer angle (radians).
    pub max_steer: f32,
    /// Distance between front and rear axles; sets the turning radius.
    pub wheelbase: f32,
    /// A speed below this snaps to zero when the target is zero.
    pub speed_epsilon: f32,
    /// Above this |steer target| the commanded speed is reduced.
    pub sharp_turn_threshold: f32,
    pub sharp_turn_factor: f32,
    /// Heading cost above which speed is reduced by `cost_mid_factor`.
    pub cost_mid: f32,
    pub cost_mid_factor: f32,
    /// Heading cost above which speed is reduced by `cost_high_factor`.
    pub cost_high: f32,
    pub cost_high_factor: f32,
    /// Knockback velocity = impact velocity (xz) * this.
    pub knockback_scale: f32,
    /// Exponential decay rate of knockback velocity (1/s).
    pub knockback_decay: f32,
    /// Upper bound on a single tick's dt (s).
    pub max_dt: f32,
}

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            spawn: [0.0, 0.0],
            autopilot_on_spawn: true,
            manual_speed: 12.0,
            wander_speed: 5.0,
            cover_speed: 10.0,
            recovery_speed: 4.0,
            accel_rate: 2.5,
            brake_rate: 8.0,
            steer_rate: 5.0,
            max_steer: 0.6,
            wheelbase: 3.2,
            speed_epsilon: 0.05,
            sharp_turn_threshold: 0.35,
            sharp_turn_factor: 0.6,
            cost_mid: 4.0,
            cost_mid_factor: 0.65,
            cost_high: 12.0,
            cost_high_factor: 0.35,
            knockback_scale: 0.5,
            knockback_decay: 3.0,
            max_dt: 0.05,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringParams {
    /// Run the cost search once every this many ticks; hold values between.
    pub interval_ticks: u32,
    /// Number of candidate headings evaluated per search.
    pub candidate_count: u32,
    /// Total angle (radians) spanned by the candidates, centered on the heading.
    pub field_of_view: f32,
    /// Weight of angular distance to the desired heading.
    pub desired_weight: f32,
    /// Weight of angular distance to the current steer angle.
    pub steer_change_weight: f32,
    /// Weight of |offset| from straight ahead.
    pub straight_weight: f32,
    /// Sample points marched along each candidate ray.
    pub sample_count: u32,
    /// Lookahead at standstill.
    pub base_lookahead: f32,
    /// Extra lookahead per unit of |speed|.
    pub lookahead_per_speed: f32,
    /// Penalty per squared unit of penetration into an inflated obstacle.
    pub obstacle_weight: f32,
    /// Penalty multiplier `1 + boost * alignment` for rays aimed at the obstacle.
    pub alignment_boost: f32,
    /// Terrain gradient above which the slope penalty applies.
    pub max_slope: f32,
    pub slope_weight: f32,
    /// A candidate whose obstacle penalty exceeds this counts as blocked.
    pub blocked_threshold: f32,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            interval_ticks: 4,
            candidate_count: 15,
            field_of_view: 2.6,
            desired_weight: 2.0,
            steer_change_weight: 0.6,
            straight_weight: 0.3,
            sample_count: 6,
            base_lookahead: 8.0,
            lookahead_per_speed: 1.2,
            obstacle_weight: 1.5,
            alignment_boost: 1.0,
            max_slope: 0.6,
            slope_weight: 4.0,
            blocked_threshold: 0.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverParams {
    /// Giants farther than this are not considered.
    pub search_radius: f32,
    /// Stop distance = `obstacle.radius * stop_factor` (but see `contact_margin`).
    pub stop_factor: f32,
    /// The stop distance is never less than collision contact plus this margin.
    pub contact_margin: f32,
    /// Once arrived, the agent only resumes driving beyond stop + this margin.
    pub arrival_margin: f32,
    /// Approach speed ramps down over this distance outside the stop distance.
    pub slow_radius: f32,
    /// Lower bound of the approach ramp, as a fraction of cover speed.
    pub min_approach_factor: f32,
    /// Spacing of the fallback depression grid.
    pub depression_grid_step: f32,
    /// Half-extent of the fallback depression grid around the agent.
    pub depression_grid_extent: f32,
    /// A depression must lie at least this far below the agent's ground.
    pub depression_min_depth: f32,
    pub depression_stop_distance: f32,
}

impl Default for CoverParams {
    fn default() -> Self {
        Self {
            search_radius: 200.0,
            stop_factor: 0.88,
            contact_margin: 0.5,
            arrival_margin: 1.5,
            slow_radius: 12.0,
            min_approach_factor: 0.25,
            depression_grid_step: 10.0,
            depression_grid_extent: 60.0,
            depression_min_depth: 2.0,
            depression_stop_distance: 3.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryParams {
    /// Stuck time (s) after which a recovery episode starts.
    pub stuck_duration: f32,
    /// Stuck timer decay per second while moving freely.
    pub stuck_decay: f32,
    /// Measured speed below this counts as not moving.
    pub stuck_speed: f32,
    /// Length (s) of a recovery episode.
    pub duration: f32,
    /// Recovery steer = ±`max_steer * steer_fraction`.
    pub steer_fraction: f32,
}

impl Default for RecoveryParams {
    fn default() -> Self {
        Self {
            stuck_duration: 1.5,
            stuck_decay: 1.0,
            stuck_speed: 0.3,
            duration: 1.5,
            steer_fraction: 1.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    /// Length (s) of one scan cycle.
    pub period: f32,
    /// The scan flag is raised for the last `active` seconds of each cycle.
    pub active: f32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            period: 8.0,
            active: 2.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelParams {
    /// Exponential rate of the retraction animation (1/s).
    pub retract_rate: f32,
    /// Systems go offline when |target - progress| rises above this.
    pub offline_enter: f32,
    /// Systems come back online when |target - progress| falls below this.
    pub offline_exit: f32,
    /// Retraction above which a hit taken under cover is absorbed.
    pub hit_immunity_retraction: f32,
}

impl Default for PanelParams {
    fn default() -> Self {
        Self {
            retract_rate: 4.0,
            offline_enter: 0.15,
            offline_exit: 0.05,
            hit_immunity_retraction: 0.8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionParams {
    pub agent_radius: f32,
    /// Contact distance = `scale * contact_factor + agent_radius`.
    pub contact_factor: f32,
    /// Under cover within `scale * cover_factor` of a giant.
    pub cover_factor: f32,
    /// Speed multiplier applied on any push-out.
    pub scrub: f32,
    /// Push-out passes per tick (resolves pushes into neighboring obstacles).
    pub max_passes: u32,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            agent_radius: 1.8,
            contact_factor: 0.85,
            cover_factor: 1.1,
            scrub: 0.85,
            max_passes: 8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionParams {
    /// Wheel mounts as (lateral, longitudinal) in the body frame; +lateral is
    /// the left side. Order: front-left, front-right, mid-left, mid-right,
    /// rear-left, rear-right.
    pub wheel_mounts: [[f32; 2]; WHEEL_COUNT],
    pub wheel_radius: f32,
    /// Body origin height above the mean wheel ground.
    pub ride_height: f32,
    /// Wheel travel either side of neutral.
    pub max_travel: f32,
    pub stiffness: f32,
    /// Defaults to `2 * sqrt(stiffness)` (critical damping).
    pub damping: f32,
    /// Front wheel angle = steer * `front_steer`.
    pub front_steer: f32,
    /// Rear wheel angle = steer * `rear_steer` (negative counter-steers).
    pub rear_steer: f32,
    /// Multiplier on the inboard wheel of a turn.
    pub inner_steer: f32,
    /// Multiplier on the outboard wheel of a turn.
    pub outer_steer: f32,
    /// Exponential rate of body height toward the wheel ground mean (1/s).
    pub body_height_rate: f32,
    /// Exponential rate of body orientation toward the terrain frame (1/s).
    pub orientation_rate: f32,
    /// Finite-difference half-step for the terrain gradient.
    pub gradient_epsilon: f32,
}

impl Default for SuspensionParams {
    fn default() -> Self {
        let stiffness: f32 = 180.0;
        Self {
            wheel_mounts: [
                [1.3, 1.6],
                [-1.3, 1.6],
                [1.3, 0.0],
                [-1.3, 0.0],
                [1.3, -1.6],
                [-1.3, -1.6],
            ],
            wheel_radius: 0.55,
            ride_height: 1.1,
            max_travel: 0.45,
            stiffness,
            damping: 2.0 * stiffness.sqrt(),
            front_steer: 1.0,
            rear_steer: -0.6,
            inner_steer: 1.2,
            outer_steer: 0.8,
            body_height_rate: 8.0,
            orientation_rate: 6.0,
            gradient_epsilon: 0.75,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level rover configuration. Loaded from JSON, never mutated at runtime.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    /// Seed of the simulation's `GameRng`.
    pub rng_seed: u64,
    pub terrain: TerrainParams,
    pub obstacles: ObstacleParams,
    pub drive: DriveParams,
    pub steering: SteeringParams,
    pub cover: CoverParams,
    pub recovery: RecoveryParams,
    pub scan: ScanParams,
    pub panels: PanelParams,
    pub collision: CollisionParams,
    pub suspension: SuspensionParams,
}

impl RoverConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reject values the simulation cannot run with (zero-sized chunks,
    /// empty candidate sets, unstable rates, inverted ranges).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let o = &self.obstacles;
        if o.chunk_size <= 0.0 {
            return Err(ConfigError::invalid("obstacles.chunk_size", "must be positive"));
        }
        for tier in &o.tiers {
            if tier.min_scale <= 0.0 || tier.min_scale > tier.max_scale {
                return Err(ConfigError::invalid(
                    "obstacles.tiers",
                    "scales must satisfy 0 < min_scale <= max_scale",
                ));
            }
        }
        let per_chunk: u32 = o.tiers.iter().map(|t| t.count).sum();
        if per_chunk > u32::from(u16::MAX) {
            return Err(ConfigError::invalid("obstacles.tiers", "too many obstacles per chunk"));
        }
        if o.runnable_threshold > o.giant_threshold {
            return Err(ConfigError::invalid(
                "obstacles.runnable_threshold",
                "must not exceed giant_threshold",
            ));
        }
        if o.radius_factor < 1.0 {
            return Err(ConfigError::invalid("obstacles.radius_factor", "must be at least 1"));
        }

        let d = &self.drive;
        if d.max_dt <= 0.0 {
            return Err(ConfigError::invalid("drive.max_dt", "must be positive"));
        }
        if d.wheelbase <= 0.0 {
            return Err(ConfigError::invalid("drive.wheelbase", "must be positive"));
        }
        if d.max_steer <= 0.0 || d.max_steer >= std::f32::consts::FRAC_PI_2 {
            return Err(ConfigError::invalid("drive.max_steer", "must be in (0, pi/2)"));
        }
        if d.accel_rate <= 0.0 || d.brake_rate <= 0.0 || d.steer_rate <= 0.0 {
            return Err(ConfigError::invalid("drive", "smoothing rates must be positive"));
        }

        let s = &self.steering;
        if s.interval_ticks == 0 {
            return Err(ConfigError::invalid("steering.interval_ticks", "must be at least 1"));
        }
        if s.candidate_count == 0 {
            return Err(ConfigError::invalid("steering.candidate_count", "must be at least 1"));
        }
        if s.sample_count == 0 {
            return Err(ConfigError::invalid("steering.sample_count", "must be at least 1"));
        }

        if self.cover.depression_grid_step <= 0.0 {
            return Err(ConfigError::invalid("cover.depression_grid_step", "must be positive"));
        }
        if self.scan.period <= 0.0 || self.scan.active > self.scan.period {
            return Err(ConfigError::invalid("scan", "need 0 < active <= period"));
        }

        let p = &self.panels;
        if p.offline_exit >= p.offline_enter {
            return Err(ConfigError::invalid(
                "panels.offline_exit",
                "must be below offline_enter to form a hysteresis band",
            ));
        }

        let c = &self.collision;
        if c.agent_radius < 0.0 || !(0.0..=1.0).contains(&c.scrub) {
            return Err(ConfigError::invalid(
                "collision",
                "agent_radius must be >= 0 and scrub in [0, 1]",
            ));
        }

        let susp = &self.suspension;
        if susp.max_travel < 0.0 || susp.stiffness <= 0.0 || susp.damping < 0.0 {
            return Err(ConfigError::invalid(
                "suspension",
                "travel and damping must be >= 0, stiffness > 0",
            ));
        }
        Ok(())
    }
}
