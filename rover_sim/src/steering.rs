// Steering cost search and cover-target selection.
//
// `search` evaluates `candidate_count` heading offsets spread evenly across
// `field_of_view`, centered on the current yaw, and picks the cheapest. The
// cost of a candidate offset `o` is the sum of:
//
//   - `desired_weight * |wrap(o - desired)|`: pull toward the goal heading
//     (toward cover, or straight ahead when wandering).
//   - `steer_change_weight * |o - steer|`: stay close to the current wheel
//     angle so the choice doesn't flip between ticks.
//   - `straight_weight * |o|`: mild preference for driving straight.
//   - Obstacle penalty: points are marched along the candidate ray out to a
//     speed-scaled lookahead. Each hard obstacle (not runnable, not the cover
//     target) whose avoidance radius inflated by the agent radius contains a
//     sample adds `obstacle_weight * penetration²`, multiplied by
//     `1 + alignment_boost * max(0, dir · to_obstacle)` so rays aimed straight
//     at a rock cost more than rays that graze it.
//   - Slope penalty: `slope_weight * (gradient - max_slope)` for every pair of
//     consecutive terrain samples steeper than `max_slope`.
//
// The first candidate with the strictly lowest cost wins (ties resolve toward
// the rightmost offset). Its offset, clamped to `max_steer`, becomes the steer
// target. If every candidate's obstacle penalty exceeds `blocked_threshold`
// the agent is blocked, which feeds stuck detection in `nav.rs`.
//
// `select_cover` picks where to flee when a threat is incoming: the nearest
// giant in range, or failing that the lowest point of a coarse terrain grid
// if it is deep enough.
//
// See also: `nav.rs` which throttles `search` to every `interval_ticks` ticks
// and turns its result into a speed and steer command.

use crate::config::RoverConfig;
use crate::terrain::HeightField;
use crate::types::{CoverTarget, Obstacle, ObstacleId, heading_vector, wrap_angle};
use glam::Vec2;
use smallvec::SmallVec;

/// One evaluated heading offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Offset from the current yaw (radians, positive turns left).
    pub offset: f32,
    pub cost: f32,
    pub obstacle_penalty: f32,
}

#[derive(Clone, Debug)]
pub struct SteeringDecision {
    pub candidates: SmallVec<[Candidate; 16]>,
    /// Index into `candidates` of the winner.
    pub best: usize,
    pub steer_target: f32,
    pub blocked: bool,
}

impl SteeringDecision {
    pub fn best_candidate(&self) -> &Candidate {
        &self.candidates[self.best]
    }
}

/// Agent state the search reads.
#[derive(Clone, Copy, Debug)]
pub struct SteeringQuery {
    pub position: Vec2,
    pub yaw: f32,
    pub steer: f32,
    pub speed: f32,
    /// Goal heading relative to `yaw`.
    pub desired_offset: f32,
    /// Obstacle the agent is heading for on purpose; never penalized.
    pub exclude: Option<ObstacleId>,
}

/// Candidate offsets spanning the field of view, right to left.
pub fn candidate_offsets(count: u32, field_of_view: f32) -> impl Iterator<Item = f32> {
    let half = field_of_view * 0.5;
    let last = count.saturating_sub(1).max(1) as f32;
    (0..count).map(move |i| {
        if count == 1 {
            0.0
        } else {
            -half + field_of_view * i as f32 / last
        }
    })
}

pub fn search(
    query: &SteeringQuery,
    obstacles: &[Obstacle],
    terrain: &HeightField,
    config: &RoverConfig,
) -> SteeringDecision {
    let s = &config.steering;
    let lookahead = s.base_lookahead + s.lookahead_per_speed * query.speed.abs();
    let samples = s.sample_count.max(1);
    let step = lookahead / samples as f32;
    let agent_radius = config.collision.agent_radius;

    // Only obstacles that any sample could reach.
    let relevant: SmallVec<[&Obstacle; 32]> = obstacles
        .iter()
        .filter(|o| !o.is_runnable(config.obstacles.runnable_threshold))
        .filter(|o| Some(o.id) != query.exclude)
        .filter(|o| o.center().distance(query.position) <= lookahead + o.radius + agent_radius)
        .collect();

    let start_height = terrain.elevation(query.position.x, query.position.y);

    let mut candidates: SmallVec<[Candidate; 16]> = SmallVec::new();
    for offset in candidate_offsets(s.candidate_count, s.field_of_view) {
        let dir = heading_vector(query.yaw + offset);

        let mut cost = s.desired_weight * wrap_angle(offset - query.desired_offset).abs()
            + s.steer_change_weight * (offset - query.steer).abs()
            + s.straight_weight * offset.abs();

        let mut obstacle_penalty = 0.0;
        let mut prev_height = start_height;
        for i in 1..=samples {
            let point = query.position + dir * (step * i as f32);

            for ob in &relevant {
                let inflated = ob.radius + agent_radius;
                let penetration = inflated - point.distance(ob.center());
                if penetration > 0.0 {
                    let to_obstacle = (ob.center() - query.position).normalize_or_zero();
                    let alignment = dir.dot(to_obstacle).max(0.0);
                    let boost = 1.0 + s.alignment_boost * alignment;
                    obstacle_penalty += s.obstacle_weight * penetration * penetration * boost;
                }
            }

            let height = terrain.elevation(point.x, point.y);
            if step > 0.0 {
                let gradient = (height - prev_height).abs() / step;
                if gradient > s.max_slope {
                    cost += s.slope_weight * (gradient - s.max_slope);
                }
            }
            prev_height = height;
        }

        cost += obstacle_penalty;
        candidates.push(Candidate {
            offset,
            cost,
            obstacle_penalty,
        });
    }

    let mut best = 0;
    for (i, c) in candidates.iter().enumerate() {
        if c.cost < candidates[best].cost {
            best = i;
        }
    }

    let max_steer = config.drive.max_steer;
    let steer_target = candidates
        .get(best)
        .map_or(0.0, |c| c.offset.clamp(-max_steer, max_steer));
    let blocked = !candidates.is_empty()
        && candidates
            .iter()
            .all(|c| c.obstacle_penalty > s.blocked_threshold);

    SteeringDecision {
        candidates,
        best,
        steer_target,
        blocked,
    }
}

// ---------------------------------------------------------------------------
// Cover selection
// ---------------------------------------------------------------------------

/// Where to hide from an incoming threat, or `None` if nowhere qualifies.
pub fn select_cover(
    position: Vec2,
    obstacles: &[Obstacle],
    terrain: &HeightField,
    config: &RoverConfig,
) -> Option<CoverTarget> {
    let giant = nearest_giant(position, obstacles, config);
    giant.or_else(|| lowest_depression(position, terrain, config))
}

fn nearest_giant(
    position: Vec2,
    obstacles: &[Obstacle],
    config: &RoverConfig,
) -> Option<CoverTarget> {
    let cover = &config.cover;
    let mut best: Option<(&Obstacle, f32)> = None;
    for ob in obstacles {
        if !ob.is_giant(config.obstacles.giant_threshold) {
            continue;
        }
        let d = ob.center().distance(position);
        if d > cover.search_radius {
            continue;
        }
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((ob, d));
        }
    }

    best.map(|(ob, _)| {
        let contact = ob.scale * config.collision.contact_factor + config.collision.agent_radius;
        CoverTarget {
            x: ob.x,
            z: ob.z,
            stop_distance: (ob.radius * cover.stop_factor).max(contact + cover.contact_margin),
            obstacle_id: Some(ob.id),
        }
    })
}

fn lowest_depression(
    position: Vec2,
    terrain: &HeightField,
    config: &RoverConfig,
) -> Option<CoverTarget> {
    let cover = &config.cover;
    let ground = terrain.elevation(position.x, position.y);
    let steps = (cover.depression_grid_extent / cover.depression_grid_step).floor() as i32;

    let mut lowest: Option<(Vec2, f32)> = None;
    for j in -steps..=steps {
        for i in -steps..=steps {
            let point = position + Vec2::new(i as f32, j as f32) * cover.depression_grid_step;
            let h = terrain.elevation(point.x, point.y);
            if lowest.is_none_or(|(_, low)| h < low) {
                lowest = Some((point, h));
            }
        }
    }

    let (point, h) = lowest?;
    if h < ground - cover.depression_min_depth {
        Some(CoverTarget {
            x: point.x,
            z: point.y,
            stop_distance: cover.depression_stop_distance,
            obstacle_id: None,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainParams;
    use crate::types::ChunkCoord;

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

    fn untouched(d: &SteeringDecision) -> bool {
        d.candidates.iter().all(|c| c.obstacle_penalty == 0.0)
    }

    fn query() -> SteeringQuery {
        SteeringQuery {
            position: Vec2::ZERO,
            yaw: 0.0,
            steer: 0.0,
            speed: 5.0,
            desired_offset: 0.0,
            exclude: None,
        }
    }

    #[test]
    fn offsets_span_the_field_of_view() {
        let offsets: Vec<f32> = candidate_offsets(15, 2.6).collect();
        assert_eq!(offsets.len(), 15);
        assert!((offsets[0] + 1.3).abs() < 1e-6);
        assert!((offsets[14] - 1.3).abs() < 1e-6);
        assert!(offsets[7].abs() < 1e-6);
        assert_eq!(candidate_offsets(1, 2.6).collect::<Vec<_>>(), vec![0.0]);
    }

    #[test]
    fn open_ground_drives_straight() {
        let config = RoverConfig::default();
        let decision = search(&query(), &[], &flat(), &config);
        assert!(decision.best_candidate().offset.abs() < 1e-6);
        assert!(decision.steer_target.abs() < 1e-6);
        assert!(!decision.blocked);
    }

    #[test]
    fn winner_has_minimum_cost() {
        let config = RoverConfig::default();
        let rocks = [rock(0, 2.0, 9.0, 4.0), rock(1, -6.0, 5.0, 3.0)];
        let q = SteeringQuery {
            desired_offset: 0.5,
            steer: 0.2,
            ..query()
        };
        let decision = search(&q, &rocks, &flat(), &config);
        let best = decision.best_candidate();
        for c in &decision.candidates {
            assert!(best.cost <= c.cost);
        }
        // No earlier candidate ties the winner.
        for c in &decision.candidates[..decision.best] {
            assert!(c.cost > best.cost);
        }
    }

    #[test]
    fn steers_around_a_rock_ahead() {
        let config = RoverConfig::default();
        let rocks = [rock(0, 0.0, 9.0, 4.0)];
        let decision = search(&query(), &rocks, &flat(), &config);
        let straight = decision.candidates[7];
        assert!(straight.obstacle_penalty > 0.0);
        assert!(decision.best_candidate().offset.abs() > 0.1);
        assert!(decision.best_candidate().obstacle_penalty < straight.obstacle_penalty);
        assert!(decision.steer_target.abs() <= config.drive.max_steer);
        assert!(!decision.blocked);
    }

    #[test]
    fn runnable_and_excluded_rocks_are_ignored() {
        let config = RoverConfig::default();
        let small = [rock(0, 0.0, 6.0, 1.0)];
        let decision = search(&query(), &small, &flat(), &config);
        assert!(untouched(&decision));

        let big = [rock(1, 0.0, 9.0, 4.0)];
        let q = SteeringQuery {
            exclude: Some(big[0].id),
            ..query()
        };
        let decision = search(&q, &big, &flat(), &config);
        assert!(untouched(&decision));
    }

    #[test]
    fn aimed_rays_cost_more_than_grazing_ones() {
        // Same penetration, different alignment: boost only changes the penalty.
        let mut config = RoverConfig::default();
        config.steering.candidate_count = 1;
        let rocks = [rock(0, 0.0, 9.0, 4.0)];
        let with_boost = search(&query(), &rocks, &flat(), &config);
        config.steering.alignment_boost = 0.0;
        let without = search(&query(), &rocks, &flat(), &config);
        assert!(with_boost.candidates[0].obstacle_penalty > without.candidates[0].obstacle_penalty);
    }

    #[test]
    fn ring_of_rocks_blocks_every_candidate() {
        let config = RoverConfig::default();
        let rocks: Vec<Obstacle> = (0..24)
            .map(|i| {
                let a = i as f32 / 24.0 * std::f32::consts::TAU;
                rock(i, 7.0 * a.sin(), 7.0 * a.cos(), 3.0)
            })
            .collect();
        let decision = search(&query(), &rocks, &flat(), &config);
        assert!(decision.blocked);
    }

    #[test]
    fn steep_slope_is_penalized() {
        let config = RoverConfig::default();
        let steep = HeightField::new(TerrainParams {
            height_scale: 0.0,
            roughness_amplitude: 0.0,
            tilt_amplitude: 400.0,
            tilt_frequency: [0.01, 0.0],
            ..TerrainParams::default()
        });
        // Gradient along x is ~4 near the origin, flat along z.
        let q = SteeringQuery {
            yaw: std::f32::consts::FRAC_PI_2,
            ..query()
        };
        let decision = search(&q, &[], &steep, &config);
        let straight = decision.candidates[7];
        assert!(straight.cost > 10.0);
        // The search turns away from the fall line.
        assert!(decision.best_candidate().offset.abs() > 0.5);
    }

    #[test]
    fn cover_prefers_nearest_giant_in_range() {
        let config = RoverConfig::default();
        let rocks = [
            rock(0, 120.0, 0.0, 15.0),
            rock(1, 30.0, 0.0, 20.0),
            rock(2, 5.0, 0.0, 6.0),
            rock(3, 400.0, 0.0, 20.0),
        ];
        let cover = select_cover(Vec2::ZERO, &rocks, &flat(), &config).unwrap();
        assert_eq!(cover.obstacle_id, Some(rocks[1].id));
        assert!((cover.stop_distance - 23.0 * 0.88).abs() < 1e-4);
    }

    #[test]
    fn stop_distance_never_inside_contact() {
        let mut config = RoverConfig::default();
        config.cover.stop_factor = 0.1;
        let rocks = [rock(0, 30.0, 0.0, 20.0)];
        let cover = select_cover(Vec2::ZERO, &rocks, &flat(), &config).unwrap();
        let contact = 20.0 * 0.85 + 1.8;
        assert!((cover.stop_distance - (contact + 0.5)).abs() < 1e-4);
    }

    #[test]
    fn no_cover_on_flat_empty_ground() {
        let config = RoverConfig::default();
        let rocks = [rock(0, 300.0, 0.0, 20.0)];
        assert_eq!(select_cover(Vec2::ZERO, &rocks, &flat(), &config), None);
    }

    #[test]
    fn falls_back_to_a_depression() {
        let config = RoverConfig::default();
        // h = 20 sin(0.05 x): the start sits on a crest, the grid reaches the troughs.
        let bowl = HeightField::new(TerrainParams {
            height_scale: 0.0,
            roughness_amplitude: 0.0,
            tilt_amplitude: 20.0,
            tilt_frequency: [0.05, 0.0],
            ..TerrainParams::default()
        });
        let start = Vec2::new(31.4, 0.0);
        let cover = select_cover(start, &[], &bowl, &config).unwrap();
        assert_eq!(cover.obstacle_id, None);
        assert_eq!(cover.stop_distance, 3.0);
        assert!(bowl.elevation(cover.x, cover.z) < bowl.elevation(start.x, start.y) - 2.0);
    }
}
