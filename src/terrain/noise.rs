//! Seeded noise rasters for terrain generation

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Noise used by [`HeightMap::randomize`](super::HeightMap::randomize)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationType {
    /// Independent value per sample, in thousandths
    Random,
    /// Octave value noise: coarse hills with finer detail layered on top
    #[default]
    PerlinNoise,
}

/// Octaves summed by [`octave_noise`] in the height generator
pub const DEFAULT_OCTAVES: u32 = 8;

/// Amplitude falloff between successive octaves
const PERSISTENCE: f32 = 0.5;

/// `size * size` independent samples in `[0, 1)`, row-major
pub fn white_noise(size: usize, rng: &mut impl Rng) -> Vec<f32> {
    (0..size * size).map(|_| rng.gen_range(0.0..1.0)).collect()
}

/// `size * size` samples in `[0, 0.999]` quantized to thousandths
pub fn random_noise(size: usize, rng: &mut impl Rng) -> Vec<f32> {
    (0..size * size)
        .map(|_| rng.gen_range(0..1000) as f32 / 1000.0)
        .collect()
}

/// Sample `base` on a lattice with spacing `2^octave`, bilinearly
/// interpolated in between. Lattice points past the edge wrap around.
fn smooth_noise(base: &[f32], size: usize, octave: u32) -> Vec<f32> {
    let period = 1_usize << octave;
    let frequency = 1.0 / period as f32;

    let mut smooth = vec![0.0; size * size];
    for y in 0..size {
        let y0 = (y / period) * period;
        let y1 = (y0 + period) % size;
        let v = (y - y0) as f32 * frequency;
        for x in 0..size {
            let x0 = (x / period) * period;
            let x1 = (x0 + period) % size;
            let h = (x - x0) as f32 * frequency;

            let top = lerp(base[x0 + y0 * size], base[x1 + y0 * size], h);
            let bottom = lerp(base[x0 + y1 * size], base[x1 + y1 * size], h);
            smooth[x + y * size] = lerp(top, bottom, v);
        }
    }
    smooth
}

/// Sum `octaves` smoothed layers of one white-noise raster. The coarsest
/// layer weighs most; the result is normalized back into `[0, 1)`.
pub fn octave_noise(size: usize, octaves: u32, rng: &mut impl Rng) -> Vec<f32> {
    let base = white_noise(size, rng);
    let mut result = vec![0.0; size * size];
    if octaves == 0 {
        return base;
    }

    let mut amplitude = 1.0;
    let mut total = 0.0;
    for octave in (0..octaves).rev() {
        amplitude *= PERSISTENCE;
        total += amplitude;
        for (out, value) in result.iter_mut().zip(smooth_noise(&base, size, octave)) {
            *out += value * amplitude;
        }
    }
    for value in &mut result {
        *value /= total;
    }
    result
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}
