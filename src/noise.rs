//! Deterministic random source for grain and jitter filters.
//!
//! Filters that need randomness draw from a generator keyed by the pixel
//! being written, so results depend only on `(seed, pixel index, stream)`
//! and never on the order pixels are visited.

// ============================================================================
// Simple RNG
// ============================================================================

/// SplitMix64 generator.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const SITE_MIX: u64 = 0xD1B5_4A32_D192_ED03;

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        SimpleRng {
            state: seed.wrapping_add(1), // Avoid zero
        }
    }

    /// Generator for one pixel site and stream.
    ///
    /// Adjacent indices produce unrelated sequences.
    pub fn at_site(seed: u64, index: usize, stream: u64) -> Self {
        let key = seed
            ^ (index as u64).wrapping_mul(GOLDEN_GAMMA)
            ^ stream.wrapping_add(1).wrapping_mul(SITE_MIX);
        let mut rng = SimpleRng::new(key);
        // Decorrelate keys that differ in a few low bits
        rng.next_u64();
        rng
    }

    /// Generate next random u64.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Generate uniform random f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Uniform value in [0, 1) for a pixel site.
#[inline]
pub fn site_uniform(seed: u64, index: usize, stream: u64) -> f64 {
    SimpleRng::at_site(seed, index, stream).next_f64()
}
