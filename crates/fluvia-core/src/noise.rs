//! Fractal noise synthesis for initial heightmaps.
//!
//! fBm: sum of octaves with per-octave frequency × lacunarity and
//! amplitude × gain, where gain = 2^(−H). Lower Hurst exponents give
//! rougher terrain (H = 1 → gain 0.5, H = 0.5 → gain ≈ 0.71).
//! Raw Perlin samples are rescaled from [−1, 1] into [0, 1] before the
//! height transform is applied.
use ::noise::{NoiseFn, Perlin};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Spatial scale of the long-range relief pass.
const RELIEF_SCALE: f64 = 1000.0;
/// Amplitude of the long-range relief pass.
const RELIEF_AMPLITUDE: f32 = 20.0;

/// Parameters of the fBm heightmap generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FbmParams {
    /// 0 = draw a seed at generation time.
    pub seed: u64,
    pub octaves: u32,
    /// 0 = draw a random offset per generation.
    pub offset_x: i32,
    /// 0 = draw a random offset per generation.
    pub offset_y: i32,
    /// Sample-coordinate divisor; larger values stretch features.
    pub scale: f32,
    /// Per-octave frequency multiplier.
    pub lacunarity: f32,
    /// Hurst exponent; per-octave gain is 2^(−hurst).
    pub hurst: f32,
    /// Base frequency of the first octave.
    pub frequency: f32,
    /// Amplitude of the first octave.
    pub amplitude: f32,
    /// Floor applied after the height transform (only when > 0).
    pub base_height: f32,
    pub height_multiplier: f32,
    pub height_modifier: f32,
    pub height_exponent: f32,
    /// Divide by the accumulated octave amplitude.
    pub normalize: bool,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 5,
            offset_x: 0,
            offset_y: 0,
            scale: 150.0,
            lacunarity: 2.0,
            hurst: 1.0,
            frequency: 0.5,
            amplitude: 0.5,
            base_height: 0.0,
            height_multiplier: 5.0,
            height_modifier: 0.0,
            height_exponent: 4.0,
            normalize: true,
        }
    }
}

/// A Perlin sample rescaled into [0, 1].
#[inline]
fn unit_noise(perlin: &Perlin, x: f64, y: f64) -> f32 {
    (perlin.get([x, y]) as f32 + 1.0) * 0.5
}

/// Resolve a possibly-unset offset, drawing from the engine RNG when 0 so
/// that runs with the same seed stay decorrelated from each other only
/// through their parameters.
fn resolve_offset(configured: i32, rng: &mut impl Rng) -> i32 {
    if configured == 0 {
        rng.gen_range(0..100_000)
    } else {
        configured
    }
}

/// Generate a `rows × cols` heightmap from layered value noise.
///
/// The permutation-table seed and any unset offsets are drawn from `rng`,
/// which makes the output a pure function of the engine seed and the
/// parameter struct. Returns an empty grid when either dimension is 0.
pub fn fbm_heightfield(
    params: &FbmParams,
    rows: usize,
    cols: usize,
    rng: &mut impl Rng,
) -> Grid<f32> {
    if rows == 0 || cols == 0 {
        return Grid::empty();
    }

    let offset_x = resolve_offset(params.offset_x, rng);
    let offset_y = resolve_offset(params.offset_y, rng);
    let perlin = Perlin::new(rng.gen());

    let gain = 2.0f32.powf(-params.hurst);
    let mut z = Grid::new(rows, cols, 0.0f32);

    for y in 0..rows {
        for x in 0..cols {
            let sample_x = (x as f32 + offset_x as f32) / params.scale;
            let sample_y = (y as f32 + offset_y as f32) / params.scale;

            let mut noise = 0.0f32;
            let mut normalization = 0.0f32;
            let mut frequency = params.frequency;
            let mut amplitude = params.amplitude;
            for _ in 0..params.octaves {
                noise += amplitude
                    * unit_noise(
                        &perlin,
                        (sample_x * frequency) as f64,
                        (sample_y * frequency) as f64,
                    );
                if params.normalize {
                    normalization += amplitude;
                }
                frequency *= params.lacunarity;
                amplitude *= gain;
            }
            if params.normalize {
                noise /= normalization;
            }

            let mut h = (noise * params.height_multiplier).powf(params.height_exponent)
                + params.height_modifier;
            if params.base_height > 0.0 && params.base_height > h {
                h = params.base_height;
            }
            z.set(y, x, h);
        }
    }
    z
}

/// Add a very-low-frequency relief swell on top of an existing heightmap.
///
/// Large gradations across the map encourage long-range flow and keep
/// basins from merging into one giant lake. Offsets left at 0 are drawn
/// from `rng`.
pub fn add_long_range_relief(
    z: &mut Grid<f32>,
    offset_x: i32,
    offset_y: i32,
    rng: &mut impl Rng,
) {
    if z.is_empty() {
        return;
    }
    let offset_x = resolve_offset(offset_x, rng);
    let offset_y = resolve_offset(offset_y, rng);
    let perlin = Perlin::new(rng.gen());

    for i in 0..z.rows() {
        for j in 0..z.cols() {
            let sample_x = (j as i64 + offset_x as i64) as f64 / RELIEF_SCALE;
            let sample_y = (i as i64 + offset_y as i64) as f64 / RELIEF_SCALE;
            let v = z.get(i, j) + unit_noise(&perlin, sample_x, sample_y) * RELIEF_AMPLITUDE;
            z.set(i, j, v);
        }
    }
}
