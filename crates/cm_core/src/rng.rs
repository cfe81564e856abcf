//! Seeded RNG for clustering init and sampled PCA fits (no OS entropy).
//!
//! All randomness in the engine flows through this newtype so that a fixed
//! seed yields bit-identical results across runs and platforms. Unbiased
//! integer ranges use rejection sampling; f64 draws use the 53-bit mantissa
//! mapping.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Newtype over ChaCha20Rng.
#[derive(Clone, Debug)]
pub struct EngineRng(ChaCha20Rng);

impl EngineRng {
    /// Construct from a 64-bit seed. The mapping to the ChaCha20 32-byte
    /// seed is explicit: `seed.to_le_bytes()` into the first 8 bytes, the
    /// remaining 24 bytes zero.
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        EngineRng(ChaCha20Rng::from_seed(bytes))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    /// Uniform draw in [0, 1) using the top 53 bits of a u64.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Unbiased integer in [0, n) via rejection sampling; None if `n == 0`.
    pub fn gen_range(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n; // == 2^64 % n
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return Some(x % n);
            }
        }
    }

    /// Index drawn proportionally to the given non-negative weights.
    /// Falls back to a uniform pick when all weights are zero; None on empty.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.iter().copied().filter(|w| *w > 0.0).sum();
        if total <= 0.0 {
            return self.gen_range(weights.len() as u64).map(|i| i as usize);
        }
        let mut target = self.next_f64() * total;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            target -= w;
            if target <= 0.0 {
                return Some(i);
            }
        }
        // Floating-point slack: land on the last positive weight.
        weights.iter().rposition(|&w| w > 0.0)
    }

    /// Uniform sample of `k` distinct indices from [0, n), in selection
    /// order (partial Fisher–Yates over an index vector).
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = i + self
                .gen_range((n - i) as u64)
                .map(|v| v as usize)
                .unwrap_or(0);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}
