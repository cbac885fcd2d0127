// Obstacle collision resolution.
//
// The rover is a disc of `agent_radius` in the xz plane. Every obstacle that
// is not runnable is a hard disc of radius `scale * contact_factor`; the two
// touch at `contact = scale * contact_factor + agent_radius`. A penetrating
// agent is projected radially out to exactly the contact distance. One push
// can shove the agent into a neighboring rock, so passes repeat until a pass
// finds no penetration or `max_passes` is reached. Between two rocks whose
// contact discs overlap on opposite sides the pushes alternate forever; if
// the last pass still leaves more than `WEDGE_SLOP` of penetration the
// outcome is flagged `wedged` and the caller gives the tick's motion back.
//
// Any push scrubs speed (`speed *= scrub`) once per tick. Under-cover
// detection is independent of pushes: the agent is under cover while within
// `scale * cover_factor` of any giant.
//
// This is deliberately not a physics engine: no contact normals fed back into
// yaw, no restitution, no broad-phase beyond the cached neighborhood list.

use crate::config::RoverConfig;
use crate::types::Obstacle;
use glam::Vec2;

/// Residual penetration tolerated after the last pass.
pub const WEDGE_SLOP: f32 = 5e-4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionOutcome {
    pub pushed: bool,
    /// The passes ran out with the agent still inside a rock.
    pub wedged: bool,
    pub under_cover: bool,
}

/// Push `position` out of every hard obstacle and report cover.
pub fn resolve(
    position: &mut Vec2,
    speed: &mut f32,
    obstacles: &[Obstacle],
    config: &RoverConfig,
) -> CollisionOutcome {
    let c = &config.collision;
    let runnable = config.obstacles.runnable_threshold;
    let mut pushed = false;

    for _ in 0..c.max_passes.max(1) {
        let mut pass_pushed = false;
        for ob in obstacles.iter().filter(|o| !o.is_runnable(runnable)) {
            let contact = ob.scale * c.contact_factor + c.agent_radius;
            let delta = *position - ob.center();
            let dist = delta.length();
            if dist < contact {
                // Dead center has no outward direction; pick +x.
                let normal = if dist > f32::EPSILON {
                    delta / dist
                } else {
                    Vec2::X
                };
                *position = ob.center() + normal * contact;
                pass_pushed = true;
            }
        }
        pushed |= pass_pushed;
        if !pass_pushed {
            break;
        }
    }

    if pushed {
        *speed *= c.scrub;
    }

    CollisionOutcome {
        pushed,
        wedged: pushed && penetration(*position, obstacles, config) > WEDGE_SLOP,
        under_cover: under_cover(*position, obstacles, config),
    }
}

/// Deepest penetration of `position` into any hard obstacle, 0 when clear.
pub fn penetration(position: Vec2, obstacles: &[Obstacle], config: &RoverConfig) -> f32 {
    let c = &config.collision;
    let runnable = config.obstacles.runnable_threshold;
    obstacles
        .iter()
        .filter(|o| !o.is_runnable(runnable))
        .map(|o| o.scale * c.contact_factor + c.agent_radius - o.center().distance(position))
        .fold(0.0, f32::max)
}

/// Within `scale * cover_factor` of any giant.
pub fn under_cover(position: Vec2, obstacles: &[Obstacle], config: &RoverConfig) -> bool {
    let giant = config.obstacles.giant_threshold;
    let cover_factor = config.collision.cover_factor;
    obstacles
        .iter()
        .filter(|o| o.is_giant(giant))
        .any(|o| o.center().distance(position) <= o.scale * cover_factor)
}
