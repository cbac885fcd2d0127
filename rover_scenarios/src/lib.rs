// Test harness for end-to-end rover scenarios.
//
// Wraps a real `RoverSim` (from `rover_sim::sim`) with a fixed 60 Hz step,
// an accumulated event log, and helpers for building obstacle layouts. All
// simulation logic runs through the same `RoverSim::step` the game calls;
// the only test-specific code is the bookkeeping here.
//
// See also: `tests/end_to_end.rs` for the scenarios.

use glam::Vec2;
use rover_sim::command::{EnvironmentalSignal, ManualInput};
use rover_sim::config::{ObstacleParams, RoverConfig, TerrainParams};
use rover_sim::event::{SimEvent, SimEventKind};
use rover_sim::sim::RoverSim;
use rover_sim::types::{ChunkCoord, Obstacle, ObstacleId};

/// Fixed frame time of every scenario.
pub const DT: f32 = 1.0 / 60.0;

/// Default config on perfectly flat ground.
pub fn flat_config() -> RoverConfig {
    RoverConfig {
        terrain: TerrainParams {
            height_scale: 0.0,
            tilt_amplitude: 0.0,
            roughness_amplitude: 0.0,
            ..TerrainParams::default()
        },
        ..RoverConfig::default()
    }
}

/// A rock with the default avoidance radius for its scale.
pub fn rock(index: u16, x: f32, z: f32, scale: f32) -> Obstacle {
    Obstacle {
        id: ObstacleId {
            chunk: ChunkCoord::new(0, 0),
            index,
        },
        x,
        z,
        radius: scale * ObstacleParams::default().radius_factor,
        scale,
    }
}

/// `count` rocks of `scale` evenly spaced on a circle around the origin.
pub fn ring(count: u16, radius: f32, scale: f32) -> Vec<Obstacle> {
    (0..count)
        .map(|i| {
            let angle = f32::from(i) / f32::from(count) * std::f32::consts::TAU;
            rock(i, radius * angle.sin(), radius * angle.cos(), scale)
        })
        .collect()
}

/// A `RoverSim` plus everything it has emitted so far.
pub struct ScenarioHarness {
    pub sim: RoverSim,
    pub events: Vec<SimEvent>,
}

impl ScenarioHarness {
    /// Procedural obstacles.
    pub fn new(config: RoverConfig) -> Self {
        Self {
            sim: RoverSim::new(config).expect("scenario config rejected"),
            events: Vec::new(),
        }
    }

    /// A fixed obstacle layout.
    pub fn with_obstacles(config: RoverConfig, obstacles: Vec<Obstacle>) -> Self {
        Self {
            sim: RoverSim::with_obstacles(config, obstacles).expect("scenario config rejected"),
            events: Vec::new(),
        }
    }

    pub fn step(&mut self, signal: EnvironmentalSignal, input: ManualInput) {
        let result = self.sim.step(signal, input, DT);
        self.events.extend(result.events);
    }

    pub fn run(&mut self, ticks: u64, signal: EnvironmentalSignal, input: ManualInput) {
        for _ in 0..ticks {
            self.step(signal, input);
        }
    }

    /// Step until `done` holds after a tick, for at most `max_ticks` ticks.
    /// Returns the number of ticks taken.
    pub fn run_until(
        &mut self,
        max_ticks: u64,
        signal: EnvironmentalSignal,
        input: ManualInput,
        mut done: impl FnMut(&RoverSim) -> bool,
    ) -> Option<u64> {
        for taken in 1..=max_ticks {
            self.step(signal, input);
            if done(&self.sim) {
                return Some(taken);
            }
        }
        None
    }

    /// First logged event matching `pred`.
    pub fn find_event(&self, pred: impl Fn(&SimEventKind) -> bool) -> Option<&SimEvent> {
        self.events.iter().find(|e| pred(&e.kind))
    }

    pub fn position(&self) -> Vec2 {
        self.sim.agent.motion.position
    }
}
