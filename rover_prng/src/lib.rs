// Deterministic randomness for the rover simulation.
//
// Two independent sources live here:
//
// - `GameRng`: xoshiro256++ (Blackman & Vigna, 2019) seeded through
//   SplitMix64. A stateful stream, owned by the simulation and used for the
//   few genuinely random decisions the agent makes (e.g. which side to steer
//   toward when backing out of a stuck position).
// - `seeded_hash`: a stateless hash `frac(sin(seed + index) * 43758.5453)`
//   keyed by floating-point coordinates. Terrain lattice values and chunk
//   obstacle layouts are derived from it, so the same world position always
//   yields the same value no matter in which order chunks are visited.
//
// **Critical constraint: determinism.** Both sources must produce identical
// output for identical input on a given platform. No OS entropy, no system
// time, no stdlib hashers.

use serde::{Deserialize, Serialize};

/// Multiplier of the sine hash. Large enough that the fractional part of the
/// product decorrelates neighboring indices.
const SINE_HASH_SCALE: f64 = 43758.5453;

/// Stateless pseudo-random value in `[0, 1)` for `(seed, index)`.
///
/// This is part of the obstacle generator's public contract: re-implementing
/// it exactly reproduces the same obstacle layouts. Evaluated in `f64` so the
/// fractional part keeps useful precision for large chunk seeds.
pub fn seeded_hash(seed: f64, index: f64) -> f64 {
    let v = (seed + index).sin() * SINE_HASH_SCALE;
    let f = v - v.floor();
    // `v - floor(v)` can round up to exactly 1.0 for tiny negative `v`.
    if f >= 1.0 { 0.0 } else { f }
}

/// Xoshiro256++ PRNG: the simulation's stream of stateful randomness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Two `GameRng` instances created with the same seed produce identical
    /// output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f32` in [0, 1) from the upper 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform value in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        assert!(low < high, "range_f32: low must be less than high");
        low + self.next_f32() * (high - low)
    }

    /// `1.0` or `-1.0` with equal probability.
    pub fn next_sign(&mut self) -> f32 {
        if self.next_u64() >> 63 == 0 {
            1.0
        } else {
            -1.0
        }
    }
}

/// SplitMix64: expands the single `u64` seed into xoshiro's 256-bit state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
