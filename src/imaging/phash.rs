//! Perceptual hash (DCT hash).
//!
//! The source is reduced to a [`SAMPLE_SIZE`]² grayscale grid by the backend;
//! this module takes the 2-D DCT-II of that grid, keeps the 8×8 block of
//! lowest frequencies and emits one bit per coefficient: `1` when it is above
//! the block mean (DC term excluded), else `0`. Visually similar images land
//! within a small Hamming distance of each other.

use std::f64::consts::PI;

/// Side of the grayscale grid the hash is computed from.
pub const SAMPLE_SIZE: usize = 32;

/// Side of the low-frequency block kept from the DCT.
const HASH_SIZE: usize = 8;

/// Coefficients this close to the mean count as equal (float noise).
const TOLERANCE: f64 = 1e-6;

/// Compute the 64-bit hash of a row-major grayscale grid as `0`/`1` characters.
pub fn dct_hash(samples: &[f64; SAMPLE_SIZE * SAMPLE_SIZE]) -> String {
    let cos = cosine_table();
    let n = SAMPLE_SIZE as f64;
    let alpha = |k: usize| {
        if k == 0 {
            (1.0 / n).sqrt()
        } else {
            (2.0 / n).sqrt()
        }
    };

    let mut coeffs = [0f64; HASH_SIZE * HASH_SIZE];
    for u in 0..HASH_SIZE {
        for v in 0..HASH_SIZE {
            let mut sum = 0.0;
            for y in 0..SAMPLE_SIZE {
                let row = &samples[y * SAMPLE_SIZE..(y + 1) * SAMPLE_SIZE];
                let cy = cos[u][y];
                for (x, &p) in row.iter().enumerate() {
                    sum += p * cy * cos[v][x];
                }
            }
            coeffs[u * HASH_SIZE + v] = alpha(u) * alpha(v) * sum;
        }
    }

    let mean = coeffs[1..].iter().sum::<f64>() / (coeffs.len() - 1) as f64;
    coeffs
        .iter()
        .map(|&c| if c - mean > TOLERANCE { '1' } else { '0' })
        .collect()
}

/// `cos[k][i] = cos(π (2i + 1) k / 2N)` for the kept frequencies.
fn cosine_table() -> [[f64; SAMPLE_SIZE]; HASH_SIZE] {
    let mut table = [[0f64; SAMPLE_SIZE]; HASH_SIZE];
    for (k, row) in table.iter_mut().enumerate() {
        for (i, cell) in row.iter_mut().enumerate() {
            *cell = (PI * (2 * i + 1) as f64 * k as f64 / (2 * SAMPLE_SIZE) as f64).cos();
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(f: impl Fn(usize, usize) -> f64) -> [f64; SAMPLE_SIZE * SAMPLE_SIZE] {
        let mut samples = [0f64; SAMPLE_SIZE * SAMPLE_SIZE];
        for y in 0..SAMPLE_SIZE {
            for x in 0..SAMPLE_SIZE {
                samples[y * SAMPLE_SIZE + x] = f(x, y);
            }
        }
        samples
    }

    fn hamming(a: &str, b: &str) -> usize {
        a.chars().zip(b.chars()).filter(|(x, y)| x != y).count()
    }

    #[test]
    fn hash_is_64_binary_chars() {
        let hash = dct_hash(&grid(|x, y| ((x * 7 + y * 3) % 255) as f64));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c == '0' || c == '1'));
    }

    #[test]
    fn uniform_image_sets_only_the_dc_bit() {
        assert_eq!(dct_hash(&grid(|_, _| 128.0)), format!("1{}", "0".repeat(63)));
    }

    #[test]
    fn brightness_shift_does_not_change_hash() {
        let base = grid(|x, y| (x * 4 + y * 2) as f64);
        let brighter = grid(|x, y| (x * 4 + y * 2) as f64 + 40.0);
        assert_eq!(dct_hash(&base), dct_hash(&brighter));
    }

    #[test]
    fn different_structure_changes_hash() {
        let horizontal = dct_hash(&grid(|x, _| (x * 8) as f64));
        let vertical = dct_hash(&grid(|_, y| (y * 8) as f64));
        assert!(hamming(&horizontal, &vertical) > 0);
    }

    #[test]
    fn hash_is_deterministic() {
        let samples = grid(|x, y| ((x ^ y) * 9) as f64);
        assert_eq!(dct_hash(&samples), dct_hash(&samples));
    }
}
