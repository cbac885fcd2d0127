// Narrative events emitted by `RoverSim::step` and `RoverSim::on_hit`.
//
// Events describe discrete happenings (mode changes, chunk crossings, cover
// decisions, hits, toggles) for UI and audio layers to react to. They are
// output only: the simulation never reads its own events back.

use crate::types::{ChunkCoord, CoverTarget, DriveMode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    ModeChanged { from: DriveMode, to: DriveMode },
    ChunkEntered { chunk: ChunkCoord },
    CoverAcquired { target: CoverTarget },
    /// No giant obstacle or deep enough depression near the agent.
    CoverUnavailable,
    CoverReached,
    RecoveryStarted { steer: f32 },
    RecoveryEnded,
    HitTaken { damage: u32 },
    HitAbsorbed,
    PanelsToggled { retract_requested: bool },
    AutopilotToggled { enabled: bool },
    ViewCycled,
}
