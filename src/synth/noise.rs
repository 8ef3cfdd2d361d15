// White noise source for click transients
//
// xorshift32 keeps it allocation-free and deterministic for a given seed,
// which is all a 20ms strike transient needs.

#[derive(Debug, Clone, Copy)]
pub struct WhiteNoise {
    state: u32,
}

impl WhiteNoise {
    pub const DEFAULT_SEED: u32 = 0x9E37_79B9;

    pub fn new(seed: u32) -> Self {
        // xorshift has a fixed point at zero
        Self {
            state: if seed == 0 { Self::DEFAULT_SEED } else { seed },
        }
    }

    /// Next sample uniformly distributed in [-1, 1)
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl Default for WhiteNoise {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}
