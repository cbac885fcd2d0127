// Chunked obstacle generation and the agent-local obstacle cache.
//
// The infinite world is partitioned into square chunks (`ChunkCoord`). Each
// chunk's rocks are a pure function of its coordinate and the global seed:
// `ChunkObstacleGenerator::obstacles_for` derives a chunk seed from the
// chunk's world offset and draws every value from `seeded_hash`, so the same
// chunk always yields the same list no matter when or how often it is asked.
//
// Tiers are generated in config order (giant, massive, large by default).
// Each obstacle consumes three draws: scale within the tier range, then x and
// z within the chunk square. Giants (scale above `giant_threshold`) that land
// inside the central corridor `|x| < corridor_half_width` are moved sideways
// to the corridor edge on the side they fell, keeping a drivable path along
// the z axis. The displacement lives here so every consumer (steering,
// collision, surface height, rendering) sees the same placement.
//
// `ObstacleCache` keeps the union of the 3×3 chunk neighborhood around the
// agent. It only recomputes when the agent's chunk changes, reusing chunks
// that stay in the neighborhood. Its contents depend only on which chunks are
// loaded, never on the path taken to get there.
//
// `ObstacleSource::Fixed` backs the cache with an explicit obstacle list
// (bucketed into chunks by position) for scripted scenarios and tests.
//
// See also: `surface.rs` for runnable rocks as ramps, `collision.rs` and
// `steering.rs` for the consumers of the cached list.
//
// **Critical constraint: determinism.** No external random source. Chunks
// are stored in a `BTreeMap` so the flattened list has a fixed order.

use crate::config::ObstacleParams;
use crate::prng::seeded_hash;
use crate::types::{ChunkCoord, Obstacle, ObstacleId};
use std::collections::BTreeMap;

/// Chunk seed weights on the chunk's world offset.
const SEED_WEIGHT_X: f64 = 123.45;
const SEED_WEIGHT_Z: f64 = 678.91;

/// Hash draws consumed per obstacle: scale, x, z.
const DRAWS_PER_OBSTACLE: u32 = 3;

#[derive(Clone, Debug)]
pub struct ChunkObstacleGenerator {
    params: ObstacleParams,
}

impl ChunkObstacleGenerator {
    pub fn new(params: ObstacleParams) -> Self {
        Self { params }
    }

    /// Scalar seed of a chunk: a linear combination of its world offset.
    pub fn chunk_seed(&self, chunk: ChunkCoord) -> f64 {
        let size = self.params.chunk_size as f64;
        let offset_x = chunk.x as f64 * size;
        let offset_z = chunk.z as f64 * size;
        offset_x * SEED_WEIGHT_X + offset_z * SEED_WEIGHT_Z + self.params.world_seed
    }

    /// All obstacles of one chunk, in generation order.
    pub fn obstacles_for(&self, chunk: ChunkCoord) -> Vec<Obstacle> {
        let p = &self.params;
        let size = p.chunk_size as f64;
        let offset_x = chunk.x as f64 * size;
        let offset_z = chunk.z as f64 * size;
        let seed = self.chunk_seed(chunk);

        let total: u32 = p.tiers.iter().map(|t| t.count).sum();
        let mut out = Vec::with_capacity(total as usize);
        let mut index: u32 = 0;

        for tier in &p.tiers {
            for _ in 0..tier.count {
                let draw = (index * DRAWS_PER_OBSTACLE) as f64;
                let r_scale = seeded_hash(seed, draw) as f32;
                let r_x = seeded_hash(seed, draw + 1.0);
                let r_z = seeded_hash(seed, draw + 2.0);

                let scale = tier.min_scale + (tier.max_scale - tier.min_scale) * r_scale;
                let mut x = (offset_x + (r_x - 0.5) * size) as f32;
                let z = (offset_z + (r_z - 0.5) * size) as f32;

                if scale > p.giant_threshold && x.abs() < p.corridor_half_width {
                    x = p.corridor_half_width.copysign(x);
                }

                out.push(Obstacle {
                    id: ObstacleId {
                        chunk,
                        index: index as u16,
                    },
                    x,
                    z,
                    radius: scale * p.radius_factor,
                    scale,
                });
                index += 1;
            }
        }
        out
    }
}

/// Where the cache gets a chunk's obstacles from.
#[derive(Clone, Debug)]
pub enum ObstacleSource {
    /// Seeded procedural generation.
    Procedural(ChunkObstacleGenerator),
    /// An explicit list; each obstacle belongs to the chunk containing its center.
    Fixed {
        chunk_size: f32,
        obstacles: Vec<Obstacle>,
    },
}

impl ObstacleSource {
    pub fn obstacles_for(&self, chunk: ChunkCoord) -> Vec<Obstacle> {
        match self {
            ObstacleSource::Procedural(generator) => generator.obstacles_for(chunk),
            ObstacleSource::Fixed {
                chunk_size,
                obstacles,
            } => obstacles
                .iter()
                .filter(|o| ChunkCoord::containing(o.x, o.z, *chunk_size) == chunk)
                .copied()
                .collect(),
        }
    }
}

/// Obstacles of the 3×3 chunk neighborhood around the agent.
#[derive(Clone, Debug)]
pub struct ObstacleCache {
    source: ObstacleSource,
    chunk_size: f32,
    center: Option<ChunkCoord>,
    chunks: BTreeMap<ChunkCoord, Vec<Obstacle>>,
    obstacles: Vec<Obstacle>,
}

impl ObstacleCache {
    pub fn new(source: ObstacleSource, chunk_size: f32) -> Self {
        Self {
            source,
            chunk_size,
            center: None,
            chunks: BTreeMap::new(),
            obstacles: Vec::new(),
        }
    }

    /// Reload the neighborhood if `(x, z)` is in a different chunk than last
    /// time. Returns the new center chunk when a reload happened.
    pub fn refresh(&mut self, x: f32, z: f32) -> Option<ChunkCoord> {
        let chunk = ChunkCoord::containing(x, z, self.chunk_size);
        if self.center == Some(chunk) {
            return None;
        }

        self.chunks.retain(|c, _| c.chebyshev_distance(chunk) <= 1);
        for c in chunk.neighborhood() {
            if !self.chunks.contains_key(&c) {
                let list = self.source.obstacles_for(c);
                self.chunks.insert(c, list);
            }
        }
        self.obstacles = self.chunks.values().flatten().copied().collect();
        self.center = Some(chunk);

        tracing::debug!(
            chunk = %chunk,
            obstacles = self.obstacles.len(),
            "obstacle neighborhood reloaded"
        );
        Some(chunk)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.chunks.get(&id.chunk)?.iter().find(|o| o.id == id)
    }
}
