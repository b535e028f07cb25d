//! Deterministic per-symbol RNG seeding.
//!
//! Seeds are derived by hashing the symbol with BLAKE3, so the same symbol
//! reproduces the same stream in every process and no global RNG state is
//! ever touched.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Derive a stable 64-bit seed from a symbol.
pub fn symbol_seed(symbol: &str) -> u64 {
    let hash = blake3::hash(symbol.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// A seeded `StdRng` for a symbol.
pub fn rng_for_symbol(symbol: &str) -> StdRng {
    StdRng::seed_from_u64(symbol_seed(symbol))
}

/// Draw from N(mean, std_dev) via the Box-Muller transform.
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // gen::<f64>() is in [0, 1); flip to (0, 1] so ln() stays finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}
