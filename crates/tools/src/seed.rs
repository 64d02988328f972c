//! Deterministic pseudo-random primitives.
//!
//! Everything a tool synthesizes for a vehicle is derived from a 31-bit
//! linear-congruential sequence (telematics) or from a `StdRng` seeded with
//! the same vehicle seed (maintenance), so repeated calls agree.

use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

const LCG_MULTIPLIER: u64 = 1_103_515_245;
const LCG_INCREMENT: u64 = 12_345;
const LCG_MASK: u64 = 0x7fff_ffff;

/// Seed derived from the first four bytes of the SHA-256 digest of `key`.
pub fn seed_for(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    u64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

/// `StdRng` keyed on `key`, for generators that need many draws.
pub fn rng_for(key: &str) -> StdRng {
    StdRng::seed_from_u64(seed_for(key))
}

/// One step of the LCG; the result always fits in 31 bits.
pub fn lcg_step(state: u64) -> u64 {
    state
        .wrapping_mul(LCG_MULTIPLIER)
        .wrapping_add(LCG_INCREMENT)
        & LCG_MASK
}

/// Map the state after one more step onto `[min, max]`.
pub fn seeded_random(state: u64, min: f64, max: f64) -> f64 {
    let normalized = lcg_step(state) as f64 / LCG_MASK as f64;
    min + normalized * (max - min)
}

/// Sequence of readings driven by the LCG.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Advance and draw a value in `[min, max]` from the new state.
    pub fn next_in(&mut self, min: f64, max: f64) -> f64 {
        self.state = lcg_step(self.state);
        seeded_random(self.state, min, max)
    }

    /// Draw from the current state without advancing.
    pub fn peek_in(&self, min: f64, max: f64) -> f64 {
        seeded_random(self.state, min, max)
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_seed_is_stable_per_key() {
        assert_eq!(seed_for("VEH001"), seed_for("VEH001"));
        assert_ne!(seed_for("VEH001"), seed_for("VEH002"));
        assert!(seed_for("VEH001") <= u64::from(u32::MAX));
    }

    #[test]
    fn test_lcg_stays_in_31_bits() {
        let mut state = u64::from(u32::MAX);
        for _ in 0..1000 {
            state = lcg_step(state);
            assert!(state <= LCG_MASK);
        }
    }

    #[test]
    fn test_lcg_known_value() {
        assert_eq!(lcg_step(0), 12_345);
        assert_eq!(lcg_step(1), 1_103_527_590);
    }

    #[test]
    fn test_seeded_random_respects_bounds() {
        let mut lcg = Lcg::new(seed_for("VEH003"));
        for _ in 0..500 {
            let v = lcg.next_in(-5.0, 15.0);
            assert!((-5.0..=15.0).contains(&v));
        }
    }

    #[test]
    fn test_rng_for_is_reproducible() {
        let mut a = rng_for("trip");
        let mut b = rng_for("trip");
        for _ in 0..5 {
            assert_eq!(a.gen::<u32>(), b.gen::<u32>());
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345_6, 1), 12.3);
        assert_eq!(round_to(12.35, 0), 12.0);
        assert_eq!(round_to(-0.004, 2), -0.0);
    }
}
