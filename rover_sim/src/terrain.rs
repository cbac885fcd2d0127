// Procedural height field.
//
// `HeightField::elevation` maps a world point to a ground height. It is a pure
// function of `(x, z)` and the `TerrainParams`: no state, no caching, no
// dependence on chunk boundaries or evaluation order.
//
// Pipeline:
//   1. Value noise: lattice corners hashed with `seeded_hash`, blended with a
//      smoothstep (cubic Hermite) curve, so the field is C1 inside a cell and
//      continuous everywhere.
//   2. Two domain-warp layers: noise evaluated at the base point displaces the
//      sample point of the second layer, whose output displaces the final
//      sample. This breaks up the axis-aligned look of a bare lattice.
//   3. Two detail octaves at 2× and 4× the base frequency, fixed weights.
//   4. Remap `(sum - bias) * height_scale`.
//   5. A low-frequency `sin(x) * cos(z)` tilt across the whole world.
//   6. A small high-frequency roughness layer.
//
// `texture_elevation` is a cheaper single-octave variant (no warp, coarser
// frequency) for non-physical uses such as ground texture tinting.
//
// See also: `surface.rs` which layers runnable rocks on top of this field,
// `suspension.rs` which reads `gradient` for body tilt.

use crate::config::TerrainParams;
use crate::prng::seeded_hash;

/// Lattice hash multipliers. Spread neighboring cells far apart in the sine
/// argument of `seeded_hash`.
const LATTICE_X: f64 = 127.1;
const LATTICE_Z: f64 = 311.7;

/// Fixed offsets that decorrelate the warp channels from each other.
const WARP_Q_OFFSET: (f32, f32) = (5.2, 1.3);
const WARP_R1_OFFSET: (f32, f32) = (1.7, 9.2);
const WARP_R2_OFFSET: (f32, f32) = (8.3, 2.8);
const DETAIL_2X_OFFSET: (f32, f32) = (3.1, 7.7);
const DETAIL_4X_OFFSET: (f32, f32) = (11.4, 4.6);

/// Seed offset of the roughness layer, so it does not mirror the base layer.
const ROUGHNESS_SEED_OFFSET: f32 = 17.0;

#[derive(Clone, Debug)]
pub struct HeightField {
    params: TerrainParams,
}

impl HeightField {
    pub fn new(params: TerrainParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Ground elevation at world `(x, z)`.
    pub fn elevation(&self, x: f32, z: f32) -> f32 {
        let p = &self.params;
        let seed = p.seed;
        let w = p.warp_strength;
        let px = x * p.base_frequency;
        let pz = z * p.base_frequency;

        // First warp layer.
        let qx = value_noise(px, pz, seed);
        let qz = value_noise(px + WARP_Q_OFFSET.0, pz + WARP_Q_OFFSET.1, seed);

        // Second warp layer, sampled at the once-warped point.
        let wx = px + w * qx;
        let wz = pz + w * qz;
        let rx = value_noise(wx + WARP_R1_OFFSET.0, wz + WARP_R1_OFFSET.1, seed);
        let rz = value_noise(wx + WARP_R2_OFFSET.0, wz + WARP_R2_OFFSET.1, seed);

        let base = value_noise(px + w * rx, pz + w * rz, seed);

        let detail_2x = value_noise(
            px * 2.0 + DETAIL_2X_OFFSET.0,
            pz * 2.0 + DETAIL_2X_OFFSET.1,
            seed,
        );
        let detail_4x = value_noise(
            px * 4.0 + DETAIL_4X_OFFSET.0,
            pz * 4.0 + DETAIL_4X_OFFSET.1,
            seed,
        );

        let [w0, w1, w2] = p.octave_weights;
        let sum = base * w0 + detail_2x * w1 + detail_4x * w2;
        let mut height = (sum - p.bias) * p.height_scale;

        let tilt = (x * p.tilt_frequency[0]).sin() * (z * p.tilt_frequency[1]).cos();
        height += tilt * p.tilt_amplitude;

        let rough = value_noise(
            x * p.roughness_frequency,
            z * p.roughness_frequency,
            seed + ROUGHNESS_SEED_OFFSET,
        );
        height + (rough - 0.5) * p.roughness_amplitude
    }

    /// Single-octave, unwarped elevation for texture generation. Shares the
    /// height scale with `elevation` but is not used by any physical query.
    pub fn texture_elevation(&self, x: f32, z: f32) -> f32 {
        let p = &self.params;
        let n = value_noise(x * p.texture_frequency, z * p.texture_frequency, p.seed);
        (n - p.bias) * p.height_scale
    }

    /// Central-difference gradient `(dh/dx, dh/dz)` with half-step `eps`.
    pub fn gradient(&self, x: f32, z: f32, eps: f32) -> (f32, f32) {
        let eps = eps.max(1e-3);
        let dx = (self.elevation(x + eps, z) - self.elevation(x - eps, z)) / (2.0 * eps);
        let dz = (self.elevation(x, z + eps) - self.elevation(x, z - eps)) / (2.0 * eps);
        (dx, dz)
    }
}

/// Hashed lattice value in `[0, 1)`.
fn lattice(ix: i32, iz: i32, seed: f32) -> f32 {
    let index = ix as f64 * LATTICE_X + iz as f64 * LATTICE_Z;
    seeded_hash(seed as f64, index) as f32
}

/// 2D value noise in `[0, 1]` with smoothstep interpolation.
fn value_noise(x: f32, z: f32, seed: f32) -> f32 {
    let x0 = x.floor();
    let z0 = z.floor();
    let fx = x - x0;
    let fz = z - z0;
    let u = fx * fx * (3.0 - 2.0 * fx);
    let v = fz * fz * (3.0 - 2.0 * fz);

    let ix = x0 as i32;
    let iz = z0 as i32;
    let a = lattice(ix, iz, seed);
    let b = lattice(ix + 1, iz, seed);
    let c = lattice(ix, iz + 1, seed);
    let d = lattice(ix + 1, iz + 1, seed);

    a + (b - a) * u + (c - a) * v + (a - b - c + d) * u * v
}
