// rover_sim: pure Rust core of the autonomous rover.
//
// This crate contains everything that decides where the rover goes and how it
// sits on the ground: the procedural height field, the chunked obstacle
// generator, the navigation state machine with its steering cost search, the
// collision resolver, and the six-wheel suspension integrator. It has no
// rendering, audio, or input-device dependencies and runs headless.
//
// Module overview:
// - `sim.rs`:        Top-level RoverSim, AgentState, the per-tick update sequence.
// - `terrain.rs`:    HeightField: domain-warped value noise elevation.
// - `obstacles.rs`:  ChunkObstacleGenerator, ObstacleSource, ObstacleCache (3×3 chunks).
// - `surface.rs`:    SurfaceQuery: terrain plus runnable rocks as ramps.
// - `steering.rs`:   Candidate-heading cost search and cover-target selection.
// - `nav.rs`:        NavState: drive-mode priorities, stuck/recovery, motion integration.
// - `collision.rs`:  Radial push-out from hard obstacles, under-cover detection.
// - `suspension.rs`: Six spring-damper wheels, wheel steering/spin, body orientation.
// - `panels.rs`:     Panel retraction animation and the "systems offline" latch.
// - `command.rs`:    EnvironmentalSignal / ManualInput: the per-tick inputs.
// - `event.rs`:      SimEvent: narrative output of each step.
// - `config.rs`:     RoverConfig: every tunable constant, loaded from JSON.
// - `error.rs`:      ConfigError.
// - `types.rs`:      ChunkCoord, Obstacle, DriveMode, ThreatPhase, angle helpers.
// - `prng`:          Re-exported from `rover_prng`: GameRng and `seeded_hash`.
//
// **Critical constraint: determinism.** Given the same config, the same
// sequence of inputs, and the same `dt` values, the simulation produces the
// same poses bit for bit. All randomness comes from `rover_prng`. No
// `HashMap`, no system time. Use `BTreeMap` for keyed collections.

pub mod collision;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod nav;
pub mod obstacles;
pub mod panels;
pub mod sim;
pub mod steering;
pub mod surface;
pub mod suspension;
pub mod terrain;
pub mod types;

pub use rover_prng as prng;
