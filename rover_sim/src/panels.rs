// Solar panel retraction and the "systems offline" latch.
//
// The panels animate between deployed (progress 0) and retracted (progress 1)
// with exponential smoothing toward the current target. While the animation
// error `|target - progress|` is large the rover's systems are offline: no
// manual control, no driving. The latch has a hysteresis band so it does not
// flicker near the boundary: it goes offline above `offline_enter` and only
// comes back online below `offline_exit`.
//
// Storms and meteor impacts force the target to retracted regardless of the
// user's toggle; the user's choice is restored once the force lifts.

use crate::config::PanelParams;
use crate::types::smoothing_alpha;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PanelState {
    /// User-selected target: true means retracted.
    pub retract_requested: bool,
    /// Animation progress in `[0, 1]`; 1 is fully retracted.
    pub progress: f32,
    pub offline: bool,
}

impl PanelState {
    pub fn toggle(&mut self) {
        self.retract_requested = !self.retract_requested;
    }

    /// Effective target progress given whether retraction is forced.
    pub fn target(&self, forced: bool) -> f32 {
        if forced || self.retract_requested {
            1.0
        } else {
            0.0
        }
    }

    /// Advance the animation and the offline latch by `dt`.
    pub fn update(&mut self, params: &PanelParams, forced: bool, dt: f32) {
        let target = self.target(forced);
        self.progress += (target - self.progress) * smoothing_alpha(params.retract_rate, dt);
        self.progress = self.progress.clamp(0.0, 1.0);

        let error = (target - self.progress).abs();
        if self.offline {
            if error < params.offline_exit {
                self.offline = false;
            }
        } else if error > params.offline_enter {
            self.offline = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn deployed_and_idle_stays_online() {
        let params = PanelParams::default();
        let mut panels = PanelState::default();
        for _ in 0..120 {
            panels.update(&params, false, DT);
            assert!(!panels.offline);
        }
        assert_eq!(panels.progress, 0.0);
    }

    #[test]
    fn toggle_goes_offline_then_recovers() {
        let params = PanelParams::default();
        let mut panels = PanelState::default();
        panels.toggle();
        panels.update(&params, false, DT);
        assert!(panels.offline);

        let mut ticks = 0;
        while panels.offline {
            panels.update(&params, false, DT);
            ticks += 1;
            assert!(ticks < 600, "panels never came back online");
        }
        assert!(1.0 - panels.progress < params.offline_exit);
    }

    #[test]
    fn latch_holds_inside_the_band() {
        let params = PanelParams::default();
        let mut panels = PanelState {
            retract_requested: true,
            progress: 0.9,
            offline: true,
        };
        // Error 0.1 is inside (0.05, 0.15): the latch keeps its state.
        panels.update(&params, false, 0.0);
        assert!(panels.offline);

        let mut online = PanelState {
            retract_requested: true,
            progress: 0.9,
            offline: false,
        };
        online.update(&params, false, 0.0);
        assert!(!online.offline);
    }

    #[test]
    fn forced_retraction_overrides_the_toggle() {
        let params = PanelParams::default();
        let mut panels = PanelState::default();
        for _ in 0..600 {
            panels.update(&params, true, DT);
        }
        assert!(panels.progress > 0.99);
        assert!(!panels.retract_requested);
        // Force lifts: back toward the user's deployed choice.
        panels.update(&params, false, DT);
        assert!(panels.progress < 0.99);
        assert!(panels.offline);
    }
}
