// Per-tick inputs to the simulation.
//
// `EnvironmentalSignal` comes from whatever schedules storms and meteors;
// `ManualInput` is the driver's intent for this tick, already reduced to
// discrete axes. Both are plain values passed into `RoverSim::step`, so a
// recorded input sequence replays exactly.

use crate::types::ThreatPhase;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentalSignal {
    pub storm_active: bool,
    pub threat_phase: ThreatPhase,
}

impl EnvironmentalSignal {
    pub fn storm() -> Self {
        Self {
            storm_active: true,
            ..Self::default()
        }
    }

    pub fn threat(phase: ThreatPhase) -> Self {
        Self {
            threat_phase: phase,
            ..Self::default()
        }
    }
}

/// Driver intent. `throttle` and `steer` are -1, 0 or 1; positive steer turns
/// left. Toggles are edge events: true on the tick the button was pressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInput {
    pub throttle: i8,
    pub steer: i8,
    pub toggle_panels: bool,
    pub toggle_autopilot: bool,
    pub toggle_view: bool,
}

impl ManualInput {
    pub fn drive(throttle: i8, steer: i8) -> Self {
        Self {
            throttle: throttle.signum(),
            steer: steer.signum(),
            ..Self::default()
        }
    }

    /// Whether the driver is asking the rover to move this tick.
    pub fn is_active(&self) -> bool {
        self.throttle != 0 || self.steer != 0
    }
}
