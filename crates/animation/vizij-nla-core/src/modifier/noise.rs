//! Turbulence for the Noise modifier.

use noise::{NoiseFn, Perlin};

/// Fixed seed so curves evaluate identically across runs and hosts.
const SEED: u32 = 0;

/// Depth-limited Perlin turbulence, normalised to `[0, 1]`.
///
/// Octave `k` samples at `size / 2^k` with weight `1 / 2^k`; the sum is divided by
/// the total weight. `z` is fixed off the integer lattice so whole-frame times with
/// unit size and phase do not all land on lattice zeros.
pub fn turbulence(size: f32, x: f32, y: f32, depth: u32) -> f32 {
    let size = if size == 0.0 { 1.0 } else { size as f64 };
    let perlin = Perlin::new(SEED);
    let (x, y, z) = (x as f64, y as f64, 0.1f64);

    let mut sum = sample(&perlin, size, x, y, z);
    let mut weight = 1.0;
    let mut amplitude = 0.5;
    for _ in 0..depth {
        sum += amplitude * sample(&perlin, size * amplitude, x, y, z);
        weight += amplitude;
        amplitude *= 0.5;
    }
    (sum / weight) as f32
}

#[inline]
fn sample(perlin: &Perlin, size: f64, x: f64, y: f64, z: f64) -> f64 {
    let n = perlin.get([x / size, y / size, z / size]);
    (0.5 * (n + 1.0)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_unit_range_and_is_deterministic() {
        for i in 0..200 {
            let t = i as f32 * 0.37;
            let a = turbulence(1.5, t, 0.3, 3);
            let b = turbulence(1.5, t, 0.3, 3);
            assert!((0.0..=1.0).contains(&a), "t={t} n={a}");
            assert_eq!(a, b);
        }
    }
}
